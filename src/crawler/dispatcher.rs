use super::fetcher::fetch_document;
use super::identity::{is_full_publication, page_identity};
use super::utils::CrawlerUtils;
use crate::model::ProcessedResult;
use crate::parsers::PageParser;
use crate::CrawlResult;
use futures::future::try_join_all;
use tracing::{error, info};

/// Fetches one page and runs a set of parsers over it
///
/// # State Machine
///
/// ```text
/// Fetching -> Eligibility-Check -> (Rejected | Parsing) -> Done
/// ```
///
/// Rejections (already visited in this session, whole-publication index
/// pages) yield an empty result set. Fetch failures and parser failures are
/// returned to the caller.
pub struct CrawlDispatcher<'a> {
    url: String,
    utils: CrawlerUtils<'a>,
    parsers: Vec<Box<dyn PageParser + 'a>>,
}

impl<'a> CrawlDispatcher<'a> {
    pub fn new(url: impl Into<String>, utils: CrawlerUtils<'a>) -> Self {
        Self {
            url: url.into(),
            utils,
            parsers: Vec::new(),
        }
    }

    pub fn add_parser(mut self, parser: impl PageParser + 'a) -> Self {
        self.parsers.push(Box::new(parser));
        self
    }

    pub fn add_boxed_parser(mut self, parser: Box<dyn PageParser + 'a>) -> Self {
        self.parsers.push(parser);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Runs the crawl
    ///
    /// # Returns
    ///
    /// The flattened parser output, every entry marked as crawled
    /// (`manual = false`) and structurally deduplicated.
    pub async fn process(&self) -> CrawlResult<Vec<ProcessedResult>> {
        info!("Fetching from: {}", self.url);

        let doc = fetch_document(self.utils.client(), &self.url).await?;

        if is_full_publication(&self.url) {
            info!("Full publication skipped: {}", self.url);
            return Ok(Vec::new());
        }

        let page_id = page_identity(&doc, &self.url)?;
        if !self.utils.visited().insert(&page_id) {
            info!("Duplicate page skipped: {} ({})", self.url, page_id);
            return Ok(Vec::new());
        }

        let parsed = try_join_all(self.parsers.iter().map(|parser| {
            let doc = &doc;
            let utils = &self.utils;
            async move {
                parser.process(doc, utils).await.map_err(|e| {
                    error!("Error parsing result ({}): {}", parser.name(), e);
                    e
                })
            }
        }))
        .await?;

        let mut results: Vec<ProcessedResult> = Vec::new();
        for result in parsed.into_iter().flatten().flatten() {
            let processed = ProcessedResult::crawled(result);
            if !results.contains(&processed) {
                results.push(processed);
            }
        }
        Ok(results)
    }
}
