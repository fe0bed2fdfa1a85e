//! Meeting-Media: a weekly schedule media harvester
//!
//! This crate crawls the pages describing a week's meeting schedule, extracts
//! references to images, videos and Bible text, resolves publication videos
//! through the publication-media catalog, downloads the assets into a local
//! per-week directory and persists the structured metadata for later use.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod metadata;
pub mod model;
pub mod ops;
pub mod package;
pub mod parsers;
pub mod probe;
pub mod store;

use thiserror::Error;

/// Main error type for Meeting-Media operations
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Crawl error: {0}")]
    Crawl(#[from] CrawlError),

    #[error("Asset store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] catalog::CatalogError),

    #[error("Package error: {0}")]
    Package(#[from] package::PackageError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Item not found: {0}")]
    NotFound(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while fetching a page or running its parsers
///
/// Any of these aborts the dispatcher invocation that produced it, but never
/// the sibling sub-crawls that already completed.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Too many redirects from {url}")]
    RedirectLimit { url: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector `{selector}`: {message}")]
    Selector { selector: String, message: String },

    #[error("Asset store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] catalog::CatalogError),
}

/// Result type alias for Meeting-Media operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for crawl operations
pub type CrawlResult<T> = std::result::Result<T, CrawlError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{MediaEntry, MediaKind, ParsedMedia, ParsingResult, ProcessedResult, WeekType};
pub use store::AssetStore;
