//! Image Trawler: a same-host image harvester
//!
//! This crate crawls a website breadth-first from a seed URL, follows links that
//! stay on the seed's host, and downloads every referenced image into a directory
//! tree that mirrors the site's URL structure, recording a CSV manifest as it goes.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for fatal crawl failures
///
/// Anything that only affects a single page or image is reported through
/// [`FetchError`] or [`StoreError`] instead and never aborts a crawl.
#[derive(Debug, Error)]
pub enum TrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid seed URL: {0}")]
    Seed(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Base directory {path} is not writable: {source}")]
    BaseDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Manifest error: {0}")]
    Manifest(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
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
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Failure to retrieve a page
#[derive(Debug, Error)]
pub enum FetchError {
    /// A retryable outcome persisted through the whole retry budget
    #[error("Gave up on {url} after {attempts} attempts: {reason}")]
    Transient {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// Non-retryable HTTP status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Non-retryable transport failure
    #[error("Request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("Failed to read body of {url}: {source}")]
    Body { url: String, source: reqwest::Error },

    #[error("{url} is not HTML (content-type: {content_type})")]
    NotHtml { url: String, content_type: String },
}

impl FetchError {
    /// Returns true if this failure came from an exhausted retry budget
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Failure to persist an image
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Download failed: {0}")]
    Download(#[from] FetchError),

    #[error("Stream interrupted for {url}: {source}")]
    Stream { url: String, source: reqwest::Error },

    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Empty body for {url}")]
    EmptyBody { url: String },
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, TrawlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, Coordinator};
pub use output::{CrawlStatistics, ManifestRecord};
pub use state::{ImageState, PageState};
pub use crate::url::{normalize_url, parse_seed, same_origin_host};
