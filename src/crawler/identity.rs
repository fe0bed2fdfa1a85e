//! Page identity and eligibility
//!
//! Most pages are identified by their URL. Pages of the online library site
//! are reachable through several URLs, so their identity is rebuilt from the
//! hidden inputs that describe the content being shown.

use super::document::Document;
use crate::CrawlResult;
use url::Url;

/// Host whose pages are identified by their hidden inputs
const LIBRARY_SITE: &str = "wol.jw.org";

/// Prefix of publication finder links
const FINDER_PATH: &str = "www.jw.org/finder";

const PAGE_INPUTS: [&str; 6] = [
    "contentRsconf",
    "contentLib",
    "contentLibLangSym",
    "contentLibLangScript",
    "site",
    "englishSym",
];

const PUBLICATION_INPUTS: [&str; 2] = ["chapNo", "docId"];

fn inputs_selector(names: &[&str]) -> String {
    names
        .iter()
        .map(|name| format!("input[id=\"{}\"]", name))
        .collect::<Vec<_>>()
        .join(",")
}

/// Computes the identity used to detect repeated visits of `url`
///
/// For library pages the identity is the sorted list of `id:value` pairs
/// of the content inputs, joined with `--`. Meeting pages additionally
/// carry a document id taken from the `docId-…` class of the schedule item
/// (or the last path segment when no such class exists). A library page
/// without any publication input falls back to its URL.
pub fn page_identity(doc: &Document, url: &str) -> CrawlResult<String> {
    if !url.to_lowercase().contains(LIBRARY_SITE) {
        return Ok(url.to_string());
    }

    if doc.select(&inputs_selector(&PUBLICATION_INPUTS))?.is_empty() {
        return Ok(url.to_string());
    }

    let all_inputs: Vec<&str> = PAGE_INPUTS.iter().chain(PUBLICATION_INPUTS.iter()).copied().collect();
    let mut pairs: Vec<String> = doc
        .select(&inputs_selector(&all_inputs))?
        .iter()
        .map(|input| {
            format!(
                "{}:{}",
                input.attr("id").unwrap_or_default(),
                input.attr("value").unwrap_or_default()
            )
        })
        .collect();

    let share_type = doc
        .select_first("input[id=\"shareType\"]")?
        .and_then(|input| input.attr("value"));
    if share_type == Some("meetings") {
        let doc_id = meeting_doc_id(doc)?;
        pairs.push("englishSym:mwb".to_string());
        pairs.push("chapNo:-1".to_string());
        pairs.push(format!("docId:{}", doc_id));
    }

    pairs.sort();
    Ok(pairs.join("--"))
}

fn meeting_doc_id(doc: &Document) -> CrawlResult<String> {
    let from_class = doc.select_first(".todayItem, .pub-mwb")?.and_then(|item| {
        item.classes()
            .find(|class| class.to_lowercase().contains("docid-"))
            .map(|class| class.split('-').nth(1).unwrap_or_default().to_string())
    });

    Ok(from_class.unwrap_or_else(|| {
        doc.url()
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string()
    }))
}

/// True for whole-publication finder links that name neither a document
/// nor an issue; those pages index an entire publication
pub fn is_full_publication(url: &str) -> bool {
    let lowered = url.to_lowercase();
    if !lowered.contains(FINDER_PATH) {
        return false;
    }
    match Url::parse(&lowered) {
        Ok(parsed) => !parsed
            .query_pairs()
            .any(|(key, _)| key == "docid" || key == "issue"),
        Err(_) => true,
    }
}
