//! Crawler module for page fetching and dispatch
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with bounded redirects
//! - The document-query adapter parsers work against
//! - Page identity and eligibility rules
//! - The crawl dispatcher and the session-wide visited-page set

mod dispatcher;
mod document;
mod fetcher;
mod identity;
mod session;
mod utils;

pub use dispatcher::CrawlDispatcher;
pub use document::{Document, Node};
pub use fetcher::{build_download_client, build_http_client, fetch_document, CONNECT_TIMEOUT, MAX_REDIRECTS};
pub use identity::{is_full_publication, page_identity};
pub use session::VisitedPages;
pub use utils::CrawlerUtils;
