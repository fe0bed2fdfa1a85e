//! Data model shared by the crawler, the asset store and the metadata store
//!
//! # Components
//!
//! - `MediaKind`: image, video, audio or text classification
//! - `ParsedMedia` / `ParsedText`: one local file, or one block of verse text with audio markers
//! - `ParsingResult` / `ProcessedResult`: a labelled, grouped set of media as produced by parsers
//! - `WeekType`: which meeting of the week a context belongs to

mod media;
mod result;
mod week;

pub use media::{MediaEntry, MediaKind, ParsedMedia, ParsedText, VerseMarker};
pub use result::{result_uid, MergeKey, ParsingResult, ProcessedResult, GROUP_SEPARATOR};
pub use week::{meetings_url, week_context, week_of_year, WeekType};
