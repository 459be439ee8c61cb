//! Crawler module for concurrent page fetching and link following
//!
//! This module contains the core crawling logic, including:
//! - The frontier queue with its visited set and completion tracking
//! - The worker pool that fetches pages and re-enqueues their links
//! - HTTP fetching with a per-request timeout
//! - HTML link extraction
//! - Progress events for observers

mod engine;
mod fetcher;
mod frontier;
mod observer;
mod parser;

pub use engine::{CrawlEngine, CrawlSummary, StopHandle};
pub use fetcher::{build_http_client, FetchError, FetchedPage, Fetcher, HttpFetcher};
pub use frontier::{Claim, Frontier, FrontierStats, Lease};
pub use observer::{CrawlEvent, CrawlObserver, TracingObserver};
pub use parser::{HtmlLinkExtractor, LinkExtractor};

use crate::config::Config;
use crate::Result;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Validate the configuration and build the HTTP client
/// 2. Restore the checkpoint, or seed the frontier with `seed`
/// 3. Fetch pages and follow their links until the frontier drains
/// 4. Write a final checkpoint
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `seed` - Start URL, ignored when resuming from a checkpoint
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl completed
/// * `Err(CrawlError)` - Invalid configuration or seed
pub async fn crawl(config: &Config, seed: &str) -> Result<CrawlSummary> {
    CrawlEngine::from_config(config)?.run(seed).await
}
