//! Statistics for a finished crawl
//!
//! The coordinator fills a [`CrawlStatistics`] from its page and image
//! ledgers when the crawl reaches quiescence (or is cancelled).

use crate::state::{ImageState, PageState};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Seed the crawl started from
    pub seed: String,

    /// Final count of page URLs per lifecycle state
    pub pages_by_state: HashMap<PageState, u64>,

    /// Final count of image URLs per lifecycle state
    pub images_by_state: HashMap<ImageState, u64>,

    /// Image references dropped because the URL was already dispatched
    pub duplicate_images: u64,

    /// Links dropped because they point at another host
    pub offsite_links: u64,

    /// Rows written to the manifest
    pub manifest_rows: u64,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// True if the crawl stopped on a shutdown signal instead of quiescence
    pub cancelled: bool,
}

impl CrawlStatistics {
    /// Creates an empty summary starting now
    pub fn new(seed: &str) -> Self {
        let now = Utc::now();
        Self {
            seed: seed.to_string(),
            pages_by_state: HashMap::new(),
            images_by_state: HashMap::new(),
            duplicate_images: 0,
            offsite_links: 0,
            manifest_rows: 0,
            started_at: now,
            finished_at: now,
            cancelled: false,
        }
    }

    pub fn pages(&self, state: PageState) -> u64 {
        self.pages_by_state.get(&state).copied().unwrap_or(0)
    }

    pub fn images(&self, state: ImageState) -> u64 {
        self.images_by_state.get(&state).copied().unwrap_or(0)
    }

    /// Pages for which a fetch was dispatched
    pub fn pages_visited(&self) -> u64 {
        self.pages(PageState::InFlight)
            + self.pages(PageState::Completed)
            + self.pages(PageState::Failed)
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Seed: {}", stats.seed);
    println!("  Started: {}", stats.started_at.to_rfc3339());
    println!("  Finished: {}", stats.finished_at.to_rfc3339());
    println!("  Duration: {}s", stats.duration_seconds());
    if stats.cancelled {
        println!("  Stopped early: shutdown requested");
    }
    println!();

    println!("Pages:");
    println!("  Visited: {}", stats.pages_visited());
    println!("  Completed: {}", stats.pages(PageState::Completed));
    println!("  Failed: {}", stats.pages(PageState::Failed));
    let abandoned = stats.pages(PageState::Enqueued);
    if abandoned > 0 {
        println!("  Never fetched: {}", abandoned);
    }
    println!("  Off-host links ignored: {}", stats.offsite_links);
    println!();

    println!("Images:");
    println!("  Stored: {}", stats.images(ImageState::Stored));
    println!("  Skipped: {}", stats.images(ImageState::Skipped));
    println!("  Failed: {}", stats.images(ImageState::Failed));
    println!("  Duplicate references: {}", stats.duplicate_images);
    println!("  Manifest rows: {}", stats.manifest_rows);
}
