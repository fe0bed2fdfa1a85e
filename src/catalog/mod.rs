//! Publication catalog: reference handles, catalog API access and the resolver
//!
//! A *reference* names a publication rendition (publication code or document
//! id, plus track and optional issue). The resolver turns a reference into a
//! queued download on the asset store.

mod api;
mod reference;
mod resolver;

pub use api::{
    best_rendition, label_value, CatalogResponse, CatalogUrlBuilder, MarkerSet, RawMarker,
    Rendition, RenditionFile,
};
pub use reference::{generate_reference_url, PublicationRef, REFERENCE_SCHEME};
pub use resolver::{ChapterAudio, PublicationResolver, ResolvedVideo};

use crate::store::StoreError;
use thiserror::Error;

/// Publication code of the songbook videos
pub const SONG_PUBLICATION: &str = "sjjm";

/// Publication code of the Bible audio recordings
pub const BIBLE_PUBLICATION: &str = "nwt";

/// Errors that can occur while resolving a publication reference
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Reference is missing required parameters: {0}")]
    MissingParameters(String),

    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid catalog response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("No rendition available for {0}")]
    NoRendition(String),

    #[error("'{title}' lasts {duration}s, above the {max}s limit")]
    DurationExceeded { title: String, duration: f64, max: f64 },

    #[error("Asset store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;
