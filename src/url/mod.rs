//! URL handling module for Image Trawler
//!
//! This module provides reference resolution, seed parsing, host extraction
//! and the same-host test used to decide which links are followed.

mod domain;
mod normalize;

pub use domain::{extract_host, same_origin_host};
pub use normalize::{normalize_url, parse_seed};
