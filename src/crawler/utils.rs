//! Helpers shared by the page parsers

use super::dispatcher::CrawlDispatcher;
use super::document::Node;
use super::session::VisitedPages;
use crate::catalog::{generate_reference_url, PublicationResolver, ResolvedVideo};
use crate::model::ProcessedResult;
use crate::parsers::{ArticleMediaParser, PageParser, SongsParser};
use crate::store::{AssetStore, EnqueuedAsset};
use crate::CrawlResult;
use reqwest::Client;

/// Query parameter that carries a video reference on plain links
const DATA_VIDEO: &str = "data-video";

/// Handles one crawl session passes down to its parsers
///
/// Cloning keeps the same visited-page set; [`isolated`](Self::isolated)
/// starts a new one.
#[derive(Clone)]
pub struct CrawlerUtils<'a> {
    client: &'a Client,
    store: &'a AssetStore,
    resolver: &'a PublicationResolver,
    visited: VisitedPages,
}

impl<'a> CrawlerUtils<'a> {
    /// Starts a new crawl session
    pub fn new(client: &'a Client, store: &'a AssetStore, resolver: &'a PublicationResolver) -> Self {
        Self {
            client,
            store,
            resolver,
            visited: VisitedPages::new(),
        }
    }

    /// Same handles, fresh visited-page set
    pub fn isolated(&self) -> Self {
        Self {
            visited: VisitedPages::new(),
            ..self.clone()
        }
    }

    pub fn client(&self) -> &'a Client {
        self.client
    }

    pub fn store(&self) -> &'a AssetStore {
        self.store
    }

    pub fn resolver(&self) -> &'a PublicationResolver {
        self.resolver
    }

    pub fn visited(&self) -> &VisitedPages {
        &self.visited
    }

    /// Video reference of an anchor: its `data-video` attribute, or the
    /// `data-video` query parameter of its link
    pub fn parse_anchor_data_video(&self, anchor: &Node<'_>) -> Option<String> {
        if let Some(value) = anchor.attr(DATA_VIDEO).filter(|v| !v.is_empty()) {
            return Some(value.to_string());
        }
        anchor
            .href()?
            .query_pairs()
            .find(|(key, _)| key == DATA_VIDEO)
            .map(|(_, value)| value.into_owned())
    }

    pub fn generate_reference_url(&self, pub_code: &str, track: impl ToString, issue: Option<&str>) -> String {
        generate_reference_url(pub_code, track, issue)
    }

    /// Resolves a video reference and queues its download
    pub async fn fetch_publication_video(&self, handle: &str) -> Option<ResolvedVideo> {
        self.resolver.resolve(handle, self.store).await
    }

    /// Queues a download of `url` into the current context
    pub async fn download(&self, url: &str, extension: &str) -> CrawlResult<EnqueuedAsset> {
        Ok(self.store.enqueue_download(url, extension).await?)
    }

    /// Crawls `url` with the given parsers
    ///
    /// With `isolated` set, the sub-crawl does not share this session's
    /// visited pages, so a page already parsed by the parent can be parsed
    /// again.
    pub async fn crawl_url(
        &self,
        url: &str,
        parsers: Vec<Box<dyn PageParser + 'a>>,
        isolated: bool,
    ) -> CrawlResult<Vec<ProcessedResult>> {
        let utils = if isolated { self.isolated() } else { self.clone() };
        let dispatcher = parsers
            .into_iter()
            .fold(CrawlDispatcher::new(url, utils), CrawlDispatcher::add_boxed_parser);
        dispatcher.process().await
    }

    /// Images and videos of a linked article
    pub async fn fetch_article_media(&self, url: &str) -> CrawlResult<Vec<ProcessedResult>> {
        let parser: Box<dyn PageParser + 'a> = Box::new(ArticleMediaParser::default());
        self.crawl_url(url, vec![parser], false).await
    }

    /// Song videos referenced by a page
    pub async fn fetch_songs_media(&self, url: &str, isolated: bool) -> CrawlResult<Vec<ProcessedResult>> {
        let parser: Box<dyn PageParser + 'a> = Box::new(SongsParser);
        self.crawl_url(url, vec![parser], isolated).await
    }
}
