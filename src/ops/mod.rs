//! Top-level operations
//!
//! Every operation builds its own [`AssetStore`] bound to one context, so
//! independent operations never share queues or crawl sessions. Queued I/O
//! is always flushed before an operation returns, including when its crawl
//! failed.

mod extras;
mod manual;

pub use extras::{BIBLE_CONTEXT, DEFAULT_SONG_COUNT, YEAR_TEXT_FILENAME};
pub use manual::{UploadFile, PACKAGE_CONTEXT, SONGS_CONTEXT};

use crate::catalog::PublicationResolver;
use crate::config::Config;
use crate::crawler::{build_download_client, build_http_client, CrawlDispatcher, CrawlerUtils};
use crate::metadata::{merge_results, MetadataStore};
use crate::model::{meetings_url, week_context, ProcessedResult, WeekType};
use crate::parsers::{MidweekParser, SongsParser, WeekendParser};
use crate::probe::{FfmpegProbe, MediaProbe};
use crate::store::{AssetStore, LogProgress, ProgressSink};
use crate::{CrawlResult, Result};
use chrono::NaiveDate;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Entry point for the operations exposed to the outside world
pub struct MediaService {
    config: Config,
    client: Client,
    download_client: Client,
    resolver: PublicationResolver,
    probe: Arc<dyn MediaProbe>,
    progress: Arc<dyn ProgressSink>,
}

impl MediaService {
    /// Creates a service with the `ffmpeg` probe and log-only progress
    pub fn new(config: Config) -> Result<Self> {
        let client = build_http_client(&config.http)?;
        let download_client = build_download_client(&config.http)?;
        let resolver = PublicationResolver::new(client.clone(), config.catalog.clone());
        Ok(Self {
            config,
            client,
            download_client,
            resolver,
            probe: Arc::new(FfmpegProbe::default()),
            progress: Arc::new(LogProgress),
        })
    }

    pub fn with_probe(mut self, probe: Arc<dyn MediaProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolver(&self) -> &PublicationResolver {
        &self.resolver
    }

    /// A fresh asset store bound to `context`
    pub fn store(&self, context: impl Into<String>) -> AssetStore {
        let mut store = AssetStore::from_config(&self.config.storage, self.download_client.clone())
            .with_read_timeout(Duration::from_secs(self.config.http.read_timeout_secs))
            .with_probe(Arc::clone(&self.probe))
            .with_progress(Arc::clone(&self.progress));
        store.set_context(context);
        store
    }

    /// Media of one week's meeting
    ///
    /// Cached metadata is returned as is unless it is missing or `force` is
    /// set, in which case the meetings page is crawled. With `force`, only
    /// manually added entries of the cached metadata are kept. The merged
    /// set is persisted when it is not empty.
    pub async fn fetch_week_media(
        &self,
        date: NaiveDate,
        week_type: WeekType,
        force: bool,
    ) -> Result<Vec<ProcessedResult>> {
        info!(
            "Fetching data for date: {} and type: {}",
            date.format("%Y-%m-%d"),
            week_type
        );
        if force {
            info!("-- Fetching with force enabled");
        }

        let store = self.store(week_context(date, week_type));
        let metadata = MetadataStore::for_store(&store)?;
        let loaded = metadata.load(force).await;

        let crawled = if loaded.is_none() || force {
            let url = meetings_url(&self.config.site.meetings_url, date);
            Some(self.crawl_week(&url, week_type, &store).await)
        } else {
            None
        };

        info!("Starting to download");
        let count = store.flush().await;
        info!("Downloaded {} media items", count);

        let fresh = crawled.transpose()?.unwrap_or_default();
        let merged = merge_results(fresh, loaded.unwrap_or_default());
        if !merged.is_empty() {
            metadata.save(&merged).await?;
        }

        Ok(merged)
    }

    async fn crawl_week(
        &self,
        url: &str,
        week_type: WeekType,
        store: &AssetStore,
    ) -> CrawlResult<Vec<ProcessedResult>> {
        let utils = CrawlerUtils::new(&self.client, store, &self.resolver);
        let dispatcher = CrawlDispatcher::new(url, utils);
        let dispatcher = match week_type {
            WeekType::Midweek => dispatcher.add_parser(SongsParser).add_parser(MidweekParser),
            WeekType::Weekend => dispatcher.add_parser(WeekendParser),
        };
        dispatcher.process().await
    }

    /// Overwrites the persisted metadata of one week's meeting
    pub async fn update_metadata(
        &self,
        date: NaiveDate,
        week_type: WeekType,
        results: &[ProcessedResult],
    ) -> Result<()> {
        let store = self.store(week_context(date, week_type));
        let metadata = MetadataStore::for_store(&store)?;
        metadata.save(results).await?;
        info!("Updated metadata {}", metadata.path().display());
        Ok(())
    }
}
