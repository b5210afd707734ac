//! Crawler module for page fetching, image storage and crawl coordination
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry and backoff
//! - HTML extraction of image sources and links
//! - Streaming image downloads into a mirrored directory tree
//! - The frontier, dispatch ledgers and bounded worker pool
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod pool;
mod store;

pub use coordinator::Coordinator;
pub use fetcher::{build_http_client, Fetcher, PageContent, RetryPolicy};
pub use frontier::{DownloadLedger, Frontier};
pub use parser::{extract_page, ExtractedPage};
pub use pool::WorkerPool;
pub use store::{file_name, target_dir, url_hash, ImageStore, StoreOutcome};

use crate::config::Config;
use crate::output::CrawlStatistics;
use crate::TrawlError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Validate the configuration and seed
/// 2. Prepare the image directory and truncate the manifest
/// 3. Build the HTTP client
/// 4. Fetch pages and download images until the site is exhausted
/// 5. Return the crawl statistics
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `seed` - Absolute http(s) URL to start from
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Crawl ran to completion
/// * `Err(TrawlError)` - Crawl could not start, or the manifest became unwritable
///
/// # Example
///
/// ```no_run
/// use image_trawler::config::Config;
/// use image_trawler::crawler::crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let stats = crawl(Config::default(), "https://example.com").await?;
/// println!("{} rows in manifest", stats.manifest_rows);
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: Config, seed: &str) -> Result<CrawlStatistics, TrawlError> {
    Coordinator::new(config, seed)?.run().await
}
