//! Page parsers
//!
//! Each parser targets one page shape. A parser returns `Ok(None)` when the
//! page is not its kind, or the results it extracted. Parsers may crawl
//! linked pages through [`CrawlerUtils`], which shares the session's
//! visited-page set.

mod article;
mod bible;
mod midweek;
mod songs;
mod weekend;

pub use article::{ArticleMediaParser, MediaSelection};
pub use bible::{BibleParser, BIBLE_GROUP};
pub use midweek::{normalize_heading, MidweekParser};
pub use songs::{song_label, SongsParser, SONGS_GROUP};
pub use weekend::{WeekendParser, WATCHTOWER_GROUP};

use crate::crawler::{CrawlerUtils, Document};
use crate::model::ParsingResult;
use crate::CrawlResult;
use async_trait::async_trait;

/// Extracts grouped media from a parsed page
///
/// Futures are not `Send`: the parsed document is confined to the task
/// that fetched it.
#[async_trait(?Send)]
pub trait PageParser {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    async fn process(
        &self,
        doc: &Document,
        utils: &CrawlerUtils<'_>,
    ) -> CrawlResult<Option<Vec<ParsingResult>>>;
}
