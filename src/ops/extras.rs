//! Year text, song count and Bible readings

use super::MediaService;
use crate::crawler::{CrawlDispatcher, CrawlerUtils};
use crate::model::ProcessedResult;
use crate::parsers::BibleParser;
use crate::{ConfigError, Error, Result};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, error};
use url::Url;

/// Cache file of the year text, inside the year's context
pub const YEAR_TEXT_FILENAME: &str = "year-text.json";

/// Context used by Bible readings
pub const BIBLE_CONTEXT: &str = "bible";

/// Song count assumed when the catalog cannot be reached
pub const DEFAULT_SONG_COUNT: u32 = 200;

fn year_text_url(endpoint: &str, locale: &str, year: i32) -> Result<Url> {
    let docid = format!("110{}800", year);
    Url::parse_with_params(
        endpoint,
        &[
            ("docid", docid.as_str()),
            ("wtlocale", locale),
            ("format", "json"),
            ("snip", "yes"),
        ],
    )
    .map_err(|e| Error::Config(ConfigError::InvalidUrl(format!("{}: {}", endpoint, e))))
}

fn chapter_url(template: &str, booknum: u32, chapter: u32) -> String {
    template
        .replace("{book}", &booknum.to_string())
        .replace("{chapter}", &chapter.to_string())
}

fn year_text_content(data: &Value) -> Option<String> {
    data.get("content").and_then(Value::as_str).map(str::to_string)
}

async fn cached_year_text(path: &Path) -> Option<String> {
    let raw = tokio::fs::read_to_string(path).await.ok()?;
    let data: Value = serde_json::from_str(&raw).ok()?;
    year_text_content(&data)
}

impl MediaService {
    /// Year text markup for `year`, cached in the year's context
    pub async fn get_year_text(&self, year: i32) -> Result<String> {
        let store = self.store(year.to_string());
        let dir = store.target_dir()?;
        store.ensure_directory(&dir).await?;
        let cache = dir.join(YEAR_TEXT_FILENAME);

        if let Some(text) = cached_year_text(&cache).await {
            debug!("Loading Year Text from cache");
            return Ok(text);
        }

        let site = &self.config.site;
        let url = year_text_url(&site.year_text_url, &site.year_text_locale, year)?;
        debug!("Fetching Year Text: {}", url);

        let http_error = |source| Error::Http {
            url: url.to_string(),
            source,
        };
        let data: Value = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(http_error)?
            .json()
            .await
            .map_err(http_error)?;

        let text = year_text_content(&data).ok_or_else(|| Error::NotFound(format!("year text for {}", year)))?;
        tokio::fs::write(&cache, serde_json::to_string_pretty(&data)?).await?;

        Ok(text)
    }

    /// Number of songs in the songbook
    ///
    /// Falls back to [`DEFAULT_SONG_COUNT`] when the catalog fails.
    pub async fn load_songs_count(&self) -> u32 {
        match self.resolver.song_count().await {
            Ok(count) => count,
            Err(e) => {
                error!("Could not load song count: {}", e);
                DEFAULT_SONG_COUNT
            }
        }
    }

    /// Text and audio timeline of `verses` of one Bible chapter
    pub async fn fetch_bible_verses(
        &self,
        booknum: u32,
        chapter: u32,
        verses: Vec<u32>,
    ) -> Result<Vec<ProcessedResult>> {
        let store = self.store(BIBLE_CONTEXT);
        let url = chapter_url(&self.config.site.bible_url, booknum, chapter);
        let utils = CrawlerUtils::new(&self.client, &store, &self.resolver);

        let results = CrawlDispatcher::new(url, utils)
            .add_parser(BibleParser::new(booknum, chapter, verses))
            .process()
            .await?;
        Ok(results)
    }
}
