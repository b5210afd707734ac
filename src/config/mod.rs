//! Configuration module for Image Trawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! A configuration file is optional: [`Config::default`] carries the stock
//! settings and every key in a file overrides only itself.
//!
//! # Example
//!
//! ```no_run
//! use image_trawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("trawler.toml")).unwrap();
//! println!("Worker pool size: {}", config.crawler.max_workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, ImageConfig, OutputConfig, RetryConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
