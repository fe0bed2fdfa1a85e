use super::article::{image_result, video_anchor_result, VIDEO_ANCHOR};
use super::PageParser;
use crate::crawler::{CrawlerUtils, Document, Node};
use crate::model::ParsingResult;
use crate::CrawlResult;
use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::debug;

/// Abbreviated part names and the label used for them
const HEADING_ABBREVIATIONS: [(&str, &str); 4] = [
    ("joias esp.", "Joias espirituais"),
    ("leit. da bíblia", "Leitura da Bíblia"),
    ("est. bíblico de cong.", "Estudo bíblico de congregação"),
    ("nec. locais", "Necessidades locais"),
];

/// Collapses whitespace runs (including non-breaking spaces) and trims, then
/// spells out abbreviated part names
///
/// A leading part number such as `"3. "` is kept.
pub fn normalize_heading(heading: &str) -> String {
    let heading = heading.split_whitespace().collect::<Vec<_>>().join(" ");

    let (number, name) = match heading.split_once(". ") {
        Some((number, name)) if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) => {
            (Some(number), name)
        }
        _ => (None, heading.as_str()),
    };

    let Some((_, full)) = HEADING_ABBREVIATIONS
        .iter()
        .find(|(short, _)| name.to_lowercase() == *short)
    else {
        return heading;
    };
    match number {
        Some(number) => format!("{}. {}", number, full),
        None => full.to_string(),
    }
}

fn mentions_song(text: &str) -> bool {
    text.to_lowercase().contains("cântico")
}

/// True when `needle` sits inside a parenthesis of `haystack`, with no other
/// parenthesis opened or closed between them
fn is_parenthesized(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = &haystack[..start];
        let after = &haystack[start + needle.len()..];
        let opened = match (before.rfind('('), before.rfind(')')) {
            (Some(open), Some(close)) => open > close,
            (Some(_), None) => true,
            _ => false,
        };
        let closed = match (after.find(')'), after.find('(')) {
            (Some(close), Some(open)) => close < open,
            (Some(_), None) => true,
            _ => false,
        };
        opened && closed
    })
}

/// True when the anchor is a parenthesized source reference, e.g.
/// `(<a href="…">lff lição 3</a>)`
fn is_source_reference(anchor: &Node<'_>) -> bool {
    anchor
        .parent()
        .map_or(false, |parent| is_parenthesized(&parent.inner_html(), &anchor.outer_html()))
}

/// Midweek meeting schedule (`.bodyTxt`)
///
/// Each `h3` heading opens a part. Images and video anchors of the part are
/// taken directly; other links are crawled as articles and their media is
/// grouped under the part heading. Song parts, source references and Bible
/// citations (`data-bid`) are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct MidweekParser;

impl MidweekParser {
    /// Elements holding a part's content
    ///
    /// A heading placed directly in the root owns the run of `div` siblings
    /// that follows it; otherwise the heading's parent is the part.
    fn part_elements<'a>(root: &Node<'a>, header: &Node<'a>) -> Vec<Node<'a>> {
        let Some(parent) = header.parent() else {
            return Vec::new();
        };
        if !parent.is_same(root) {
            return vec![parent];
        }

        let mut elements = Vec::new();
        let mut current = header.next_element_sibling();
        while let Some(next) = current.filter(|n| n.tag() == "div") {
            elements.push(next);
            current = next.next_element_sibling();
        }
        elements
    }

    async fn item_results(
        utils: &CrawlerUtils<'_>,
        item: &Node<'_>,
        index: usize,
        base_url: &str,
        title: &str,
    ) -> CrawlResult<Vec<ParsingResult>> {
        let is_video_anchor = item.tag() == "a" && item.matches(VIDEO_ANCHOR)?;
        match item.tag() {
            "img" => Ok(image_result(utils, item, index, base_url, title)
                .await?
                .into_iter()
                .collect()),
            "a" if is_video_anchor => Ok(video_anchor_result(utils, item, title)
                .await
                .into_iter()
                .collect()),
            "a" => {
                let Some(url) = item.href() else {
                    return Ok(Vec::new());
                };
                if is_source_reference(item) || item.has_attr("data-bid") || mentions_song(&item.text()) {
                    debug!("Skipping link {}", url);
                    return Ok(Vec::new());
                }
                let linked = utils.fetch_article_media(url.as_str()).await?;
                Ok(linked
                    .into_iter()
                    .map(|processed| processed.result.regroup_under(title))
                    .collect())
            }
            _ => Ok(Vec::new()),
        }
    }
}

#[async_trait(?Send)]
impl PageParser for MidweekParser {
    fn name(&self) -> &'static str {
        "midweek"
    }

    async fn process(
        &self,
        doc: &Document,
        utils: &CrawlerUtils<'_>,
    ) -> CrawlResult<Option<Vec<ParsingResult>>> {
        let Some(root) = doc.select_first(".bodyTxt")? else {
            return Ok(None);
        };
        let base_url = doc.origin();
        let mut media = Vec::new();

        for header in root.select("h3")? {
            let parts = Self::part_elements(&root, &header);
            if parts.is_empty() {
                continue;
            }

            let title = normalize_heading(&header.text());
            if mentions_song(&title) {
                continue;
            }

            for part in parts {
                let items = part.select("img, a")?;
                let results = try_join_all(items.iter().enumerate().map(|(index, item)| {
                    Self::item_results(utils, item, index, &base_url, &title)
                }))
                .await?;
                media.extend(results.into_iter().flatten());
            }
        }

        Ok(Some(media))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::testing::{document, mount_video, resolver, store};
    use reqwest::Client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_normalize_heading() {
        assert_eq!(normalize_heading("  1.\u{a0}Joias\n espirituais "), "1. Joias espirituais");
        assert_eq!(normalize_heading("2. Joias esp."), "2. Joias espirituais");
        assert_eq!(normalize_heading("Leit. da  Bíblia"), "Leitura da Bíblia");
        assert_eq!(normalize_heading("7. Est. bíblico de cong."), "7. Estudo bíblico de congregação");
        assert_eq!(normalize_heading("5. Leit. da Bíblia: Sal 23"), "5. Leit. da Bíblia: Sal 23");
    }

    #[test]
    fn test_is_parenthesized() {
        assert!(is_parenthesized("Estudo (<a>x</a> ponto 4)", "<a>x</a>"));
        assert!(!is_parenthesized("<a>x</a> (veja nota)", "<a>x</a>"));
        assert!(!is_parenthesized("(nota) <a>x</a> (outra)", "<a>x</a>"));
        assert!(is_parenthesized("<a>x</a> e (<a>x</a>)", "<a>x</a>"));
    }

    #[test]
    fn test_source_reference_detection() {
        let doc = document(
            r#"<p id="p">Estudo (<a href="/lff">lff lição 3</a> ponto 4)</p>
               <p id="q"><a href="/art">Artigo</a> (veja nota)</p>"#,
        );
        let source = doc.select_first("#p a").unwrap().unwrap();
        let plain = doc.select_first("#q a").unwrap().unwrap();
        assert!(is_source_reference(&source));
        assert!(!is_source_reference(&plain));
    }

    #[test]
    fn test_part_elements() {
        let doc = document(
            r#"<div class="bodyTxt">
                <h3 id="a">A</h3><div id="a1"></div><div id="a2"></div><p></p><div id="x"></div>
                <div id="wrap"><h3 id="b">B</h3></div>
            </div>"#,
        );
        let root = doc.select_first(".bodyTxt").unwrap().unwrap();
        let a = doc.select_first("#a").unwrap().unwrap();
        let b = doc.select_first("#b").unwrap().unwrap();

        let parts: Vec<_> = MidweekParser::part_elements(&root, &a)
            .iter()
            .map(|n| n.attr("id").unwrap())
            .collect();
        assert_eq!(parts, vec!["a1", "a2"]);

        let parts: Vec<_> = MidweekParser::part_elements(&root, &b)
            .iter()
            .map(|n| n.attr("id").unwrap())
            .collect();
        assert_eq!(parts, vec!["wrap"]);
    }

    #[tokio::test]
    async fn test_midweek_parts() {
        let server = MockServer::start().await;
        mount_video(&server, "mwbv", "7", "Parte em vídeo").await;
        Mock::given(method("GET"))
            .and(path("/linked"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><body><div id="article"><h1>Linked</h1><img src="/img/linked.png"></div></body></html>"#,
            ))
            .mount(&server)
            .await;

        let client = Client::new();
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let resolver = resolver(&server);
        let utils = CrawlerUtils::new(&client, &store, &resolver);

        let html = format!(
            r#"<div class="bodyTxt">
                <h3>CÂNTICO 10</h3><div><a href="{uri}/song">Cântico 10</a></div>
                <h3>1. Joias</h3>
                <div>
                    <img src="/img/part.jpg" alt="Parte">
                    <a data-video="webpubvid://?pub=mwbv&amp;track=7">Vídeo</a>
                    <p>Leia (<a href="{uri}/source">lff</a>)</p>
                    <a href="{uri}/bible" data-bid="1">Gên. 1:1</a>
                    <a href="{uri}/linked">Artigo</a>
                </div>
            </div>"#,
            uri = server.uri()
        );
        let doc = document(&html);
        let results = MidweekParser.process(&doc, &utils).await.unwrap().unwrap();

        let groups: Vec<_> = results.iter().map(|r| r.group.as_str()).collect();
        assert_eq!(groups, vec!["1. Joias", "1. Joias", "1. Joias :: Linked"]);
        assert_eq!(results[0].label, "Parte");
        assert_eq!(results[1].label, "Parte em vídeo");
        assert!(results[2].media[0].path().unwrap().ends_with("linked.png"));
    }

    #[tokio::test]
    async fn test_missing_root_is_not_applicable() {
        let server = MockServer::start().await;
        let client = Client::new();
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let resolver = resolver(&server);
        let utils = CrawlerUtils::new(&client, &store, &resolver);

        let doc = document("<h3>Parte</h3>");
        assert!(MidweekParser.process(&doc, &utils).await.unwrap().is_none());
    }
}
