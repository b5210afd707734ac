//! Output module for crawl artifacts
//!
//! This module handles:
//! - Writing the CSV manifest of stored images
//! - Recording and printing crawl statistics

mod manifest;
pub mod stats;

pub use manifest::{ManifestRecord, ManifestWriter, MANIFEST_HEADERS};
pub use stats::{print_statistics, CrawlStatistics};
