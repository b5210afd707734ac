//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageState`: lifecycle of a page URL (enqueued, in flight, completed, failed)
//! - `ImageState`: lifecycle of an image URL (dispatched, stored, skipped, failed)

mod page_state;

pub use page_state::{ImageState, PageState};
