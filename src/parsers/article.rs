use super::PageParser;
use crate::catalog::{PublicationRef, ResolvedVideo};
use crate::crawler::{CrawlerUtils, Document, Node};
use crate::model::{MediaEntry, MediaKind, ParsedMedia, ParsingResult};
use crate::CrawlResult;
use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::warn;
use url::Url;

/// Anchors that reference a video instead of another page
pub(crate) const VIDEO_ANCHOR: &str = r#"a[data-video], a[href*="data-video="]"#;

/// Which media kinds an [`ArticleMediaParser`] extracts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaSelection {
    pub images: bool,
    pub videos: bool,
}

impl Default for MediaSelection {
    fn default() -> Self {
        Self {
            images: true,
            videos: true,
        }
    }
}

impl MediaSelection {
    fn selector(&self) -> Option<String> {
        let mut parts = Vec::new();
        if self.images {
            parts.push("img".to_string());
        }
        if self.videos {
            parts.push(format!("{}, video", VIDEO_ANCHOR));
        }
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

/// Images and videos of a single article (`#article`)
///
/// Every result is grouped under the article title: the `h1` text, or the
/// document title up to the first em dash.
#[derive(Debug, Clone, Default)]
pub struct ArticleMediaParser {
    selection: MediaSelection,
}

impl ArticleMediaParser {
    pub fn new(selection: MediaSelection) -> Self {
        Self { selection }
    }
}

#[async_trait(?Send)]
impl PageParser for ArticleMediaParser {
    fn name(&self) -> &'static str {
        "article-media"
    }

    async fn process(
        &self,
        doc: &Document,
        utils: &CrawlerUtils<'_>,
    ) -> CrawlResult<Option<Vec<ParsingResult>>> {
        let Some(root) = doc.select_first("#article")? else {
            return Ok(None);
        };
        let Some(selector) = self.selection.selector() else {
            return Ok(Some(Vec::new()));
        };

        let title = article_title(doc, &root)?;
        let base_url = doc.origin();
        let items = root.select(&selector)?;

        let results = try_join_all(items.iter().enumerate().map(|(index, item)| {
            let title = title.as_str();
            let base_url = base_url.as_str();
            async move {
                match item.tag() {
                    "img" => image_result(utils, item, index, base_url, title).await,
                    "a" => Ok(video_anchor_result(utils, item, title).await),
                    "video" => Ok(video_element_result(utils, item, base_url, title).await),
                    _ => Ok(None),
                }
            }
        }))
        .await?;

        Ok(Some(results.into_iter().flatten().collect()))
    }
}

fn article_title(doc: &Document, root: &Node<'_>) -> CrawlResult<String> {
    if let Some(h1) = root.select("h1")?.first() {
        return Ok(h1.text().trim().to_string());
    }
    Ok(doc
        .title()
        .and_then(|title| title.split('—').next().map(|t| t.trim().to_string()))
        .unwrap_or_default())
}

/// Extension of the last path segment, or `jpeg` when it has none
fn image_format(src: &str) -> String {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    let segment = path.rsplit('/').next().unwrap_or(path);
    match segment.rsplit_once('.') {
        Some((_, extension)) if !extension.is_empty() => extension.to_string(),
        _ => "jpeg".to_string(),
    }
}

fn absolute_src(src: &str, base_url: &str, img: &Node<'_>) -> Option<String> {
    if src.starts_with('/') && !src.starts_with("//") {
        return Some(format!("{}{}", base_url, src));
    }
    img.document().resolve(src).map(String::from)
}

/// Queues one article image
///
/// Images that belong to an alternate presentation or sit inside a video
/// anchor are skipped. The label is the figure caption, falling back to the
/// alt text (`Imagem N` when absent).
pub(crate) async fn image_result(
    utils: &CrawlerUtils<'_>,
    img: &Node<'_>,
    index: usize,
    base_url: &str,
    group: &str,
) -> CrawlResult<Option<ParsingResult>> {
    if img.closest(".alternatePresentation")?.is_some() || img.closest(VIDEO_ANCHOR)?.is_some() {
        return Ok(None);
    }

    let Some(src) = img.attr("src").filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };
    let alt = img
        .attr("alt")
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Imagem {}", index + 1));

    let caption = match img.closest("figure")? {
        Some(figure) => figure
            .select("figcaption")?
            .first()
            .map(|caption| caption.text().trim().to_string()),
        None => None,
    };
    let label = caption.unwrap_or_else(|| alt.clone());

    let Some(full_src) = absolute_src(src, base_url, img) else {
        warn!("Unresolvable image source: {}", src);
        return Ok(None);
    };

    match utils.download(&full_src, &image_format(src)).await {
        Ok(asset) => Ok(Some(
            ParsingResult::new(
                group,
                label,
                MediaKind::Image,
                vec![MediaEntry::Image(ParsedMedia::pending(asset.path))],
            )
            .with_alt(alt),
        )),
        Err(e) => {
            warn!("Skipping image {}: {}", full_src, e);
            Ok(None)
        }
    }
}

/// Media of a resolved video: the video plus its thumbnail
pub(crate) fn video_media(video: &ResolvedVideo) -> Vec<MediaEntry> {
    let mut media = vec![MediaEntry::Video(
        ParsedMedia::pending(&video.path).with_duration(video.duration),
    )];
    if let Some(thumbnail) = &video.thumbnail {
        media.push(MediaEntry::Image(ParsedMedia::pending(thumbnail)));
    }
    media
}

/// Video result labelled with the catalog title
pub(crate) fn video_result(group: &str, video: ResolvedVideo) -> ParsingResult {
    ParsingResult::new(group, video.title.as_str(), MediaKind::Video, video_media(&video))
        .with_alt(video.title)
}

/// Resolves a video anchor (`data-video` attribute or query parameter)
pub(crate) async fn video_anchor_result(
    utils: &CrawlerUtils<'_>,
    anchor: &Node<'_>,
    group: &str,
) -> Option<ParsingResult> {
    let handle = utils.parse_anchor_data_video(anchor)?;
    let video = utils.fetch_publication_video(&handle).await?;
    Some(video_result(group, video))
}

/// Resolves an embedded `<video data-json-src=…>` element
async fn video_element_result(
    utils: &CrawlerUtils<'_>,
    video: &Node<'_>,
    base_url: &str,
    group: &str,
) -> Option<ParsingResult> {
    let Some(source) = video.attr("data-json-src") else {
        warn!("Video url was not found: {}", video.outer_html());
        return None;
    };

    let url = Url::parse(&format!("{}/", base_url)).ok()?.join(source).ok()?;
    let param = |name: &str| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };
    let track = param("track").and_then(|track| {
        let digits: String = track.trim().chars().take_while(char::is_ascii_digit).collect();
        digits.parse::<u32>().ok()
    });

    let reference = PublicationRef {
        pub_code: param("pub"),
        track: track.map(|t| t.to_string()),
        ..PublicationRef::default()
    };
    let resolved = utils.fetch_publication_video(&reference.to_handle()).await?;
    Some(video_result(group, resolved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::testing::{document, mount_video, resolver, store};
    use reqwest::Client;
    use wiremock::MockServer;

    #[test]
    fn test_image_format() {
        assert_eq!(image_format("/img/x.jpg"), "jpg");
        assert_eq!(image_format("https://cdn.test/a/b.PNG?v=2"), "PNG");
        assert_eq!(image_format("https://cdn.test/image/1234"), "jpeg");
        assert_eq!(image_format("https://cdn.test.dir/image"), "jpeg");
    }

    #[test]
    fn test_media_selection() {
        assert_eq!(MediaSelection::default().selector().unwrap(), format!("img, {}, video", VIDEO_ANCHOR));
        let images = MediaSelection {
            images: true,
            videos: false,
        };
        assert_eq!(images.selector().as_deref(), Some("img"));
        let none = MediaSelection {
            images: false,
            videos: false,
        };
        assert!(none.selector().is_none());
    }

    #[test]
    fn test_article_title_fallback() {
        let doc = document("<html><head><title>Estudo — Biblioteca</title></head><body><div id=\"article\"></div></body></html>");
        let root = doc.select_first("#article").unwrap().unwrap();
        assert_eq!(article_title(&doc, &root).unwrap(), "Estudo");
    }

    #[tokio::test]
    async fn test_page_without_article_is_not_applicable() {
        let server = MockServer::start().await;
        let client = Client::new();
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let resolver = resolver(&server);
        let utils = CrawlerUtils::new(&client, &store, &resolver);

        let doc = document("<div><img src=\"/a.jpg\"></div>");
        let result = ArticleMediaParser::default().process(&doc, &utils).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_article_images_and_videos() {
        let server = MockServer::start().await;
        mount_video(&server, "mwbv", "3", "Video title").await;

        let client = Client::new();
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let resolver = resolver(&server);
        let utils = CrawlerUtils::new(&client, &store, &resolver);

        let doc = document(
            r#"<div id="article"><h1> Article </h1>
                <figure><img src="/img/x.jpg" alt="Alt"><figcaption> Caption </figcaption></figure>
                <img src="https://cdn.test/img/noalt">
                <div class="alternatePresentation"><img src="/img/skip.jpg"></div>
                <a data-video="webpubvid://?pub=mwbv&amp;track=3"><img src="/img/poster.jpg"></a>
            </div>"#,
        );
        let results = ArticleMediaParser::default()
            .process(&doc, &utils)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.group == "Article"));

        let captioned = &results[0];
        assert_eq!(captioned.kind, MediaKind::Image);
        assert_eq!(captioned.label, "Caption");
        assert_eq!(captioned.alt.as_deref(), Some("Alt"));
        assert!(captioned.media[0].path().unwrap().ends_with("x.jpg"));

        let plain = &results[1];
        assert_eq!(plain.label, "Imagem 2");
        assert!(plain.media[0].path().unwrap().ends_with("noalt.jpeg"));

        let video = &results[2];
        assert_eq!(video.kind, MediaKind::Video);
        assert_eq!(video.label, "Video title");
        assert_eq!(video.media.len(), 2);
        assert_eq!(video.media[0].kind(), MediaKind::Video);
        assert_eq!(video.media[1].kind(), MediaKind::Image);

        assert_eq!(store.pending().downloads, 3);
    }

    #[tokio::test]
    async fn test_video_element_uses_json_source() {
        let server = MockServer::start().await;
        mount_video(&server, "ijwfq", "5", "Embedded").await;

        let client = Client::new();
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let resolver = resolver(&server);
        let utils = CrawlerUtils::new(&client, &store, &resolver);

        let doc = document(
            r#"<div id="article"><h1>A</h1>
                <video data-json-src="apis/media?pub=ijwfq&amp;track=05"></video>
                <video></video>
            </div>"#,
        );
        let results = ArticleMediaParser::default()
            .process(&doc, &utils)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].label, "Embedded");
    }
}
