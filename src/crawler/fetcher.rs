//! HTTP fetcher for schedule and article pages
//!
//! This module handles all page requests for the crawler, including:
//! - Building the shared HTTP client from the `[http]` configuration
//! - GET requests with bounded redirect following
//! - Error classification into [`CrawlError`]

use super::document::Document;
use crate::config::HttpConfig;
use crate::{CrawlError, CrawlResult};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Maximum redirect hops followed for one request
pub const MAX_REDIRECTS: usize = 10;

/// Connect timeout shared by page and download clients
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds an HTTP client with proper configuration
///
/// The same client is shared by page fetches and catalog queries of one
/// operation. Asset downloads use [`build_download_client`].
///
/// # Arguments
///
/// * `config` - The HTTP configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use meeting_media::config::HttpConfig;
/// use meeting_media::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Builds the client used for asset downloads
///
/// Only connecting is bounded. A video may take far longer than
/// `timeout-secs` to stream, so stalls are detected per chunk by the asset
/// store instead (`read-timeout-secs`).
pub fn build_download_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .build()
}

/// Fetches `url` and parses the body as an HTML document
///
/// # Request Flow
///
/// 1. Send GET request, following at most [`MAX_REDIRECTS`] redirects
/// 2. Non-success status codes fail the fetch
/// 3. The body is parsed against the final (post-redirect) URL, so
///    relative links resolve the way a browser would resolve them
///
/// # Errors
///
/// | Condition | Error |
/// |-----------|-------|
/// | Unparseable URL | `CrawlError::InvalidUrl` |
/// | Redirect chain > 10 | `CrawlError::RedirectLimit` |
/// | Connection, timeout, body read | `CrawlError::Http` |
/// | HTTP 4xx / 5xx | `CrawlError::Status` |
pub async fn fetch_document(client: &Client, url: &str) -> CrawlResult<Document> {
    let parsed = Url::parse(url).map_err(|e| CrawlError::InvalidUrl(format!("{}: {}", url, e)))?;

    let response = client.get(parsed).send().await.map_err(|source| {
        if source.is_redirect() {
            CrawlError::RedirectLimit {
                url: url.to_string(),
            }
        } else {
            CrawlError::Http {
                url: url.to_string(),
                source,
            }
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(CrawlError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let final_url = response.url().clone();
    if final_url.as_str() != url {
        debug!("{} redirected to {}", url, final_url);
    }

    let body = response.text().await.map_err(|source| CrawlError::Http {
        url: url.to_string(),
        source,
    })?;

    Ok(Document::parse(&body, final_url))
}
