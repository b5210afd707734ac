//! Frontier and dispatch ledgers
//!
//! This module handles:
//! - The FIFO queue of page URLs awaiting a fetch
//! - The visited set (every page URL whose fetch was dispatched)
//! - The downloaded set (every image URL whose download was dispatched)
//!
//! Both ledgers are owned by the coordinator and mutated only from its loop,
//! so every check-and-mark is a single `&mut self` call with no window for a
//! second dispatch of the same URL.

use crate::state::{ImageState, PageState};
use std::collections::{HashMap, VecDeque};
use url::Url;

/// Breadth-first frontier plus the lifecycle of every page URL seen
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<Url>,
    pages: HashMap<Url, PageState>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a URL to the tail of the queue
    ///
    /// Returns false (and does nothing) if the URL is already queued or has
    /// ever been dispatched.
    pub fn push(&mut self, url: Url) -> bool {
        if self.pages.contains_key(&url) {
            return false;
        }
        self.pages.insert(url.clone(), PageState::Enqueued);
        self.queue.push_back(url);
        true
    }

    /// Pops the head of the queue and marks it visited in the same step
    ///
    /// The URL is in flight from this point on and can never be enqueued
    /// again.
    pub fn pop_for_dispatch(&mut self) -> Option<Url> {
        let url = self.queue.pop_front()?;
        self.transition(&url, PageState::InFlight);
        Some(url)
    }

    /// Records the outcome of a dispatched fetch
    pub fn finish(&mut self, url: &Url, succeeded: bool) {
        let next = if succeeded {
            PageState::Completed
        } else {
            PageState::Failed
        };
        self.transition(url, next);
    }

    /// Drops every queued URL; used when a crawl is cancelled
    ///
    /// Abandoned URLs stay `Enqueued` in the ledger so statistics can report
    /// them.
    pub fn clear_queue(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        dropped
    }

    /// True once a fetch for `url` has been dispatched
    pub fn is_visited(&self, url: &Url) -> bool {
        matches!(
            self.pages.get(url),
            Some(PageState::InFlight | PageState::Completed | PageState::Failed)
        )
    }

    pub fn state(&self, url: &Url) -> PageState {
        self.pages.get(url).copied().unwrap_or(PageState::Undiscovered)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Count of page URLs in each state
    pub fn state_counts(&self) -> HashMap<PageState, u64> {
        count_states(self.pages.values().copied())
    }

    fn transition(&mut self, url: &Url, next: PageState) {
        let current = self.state(url);
        debug_assert!(
            current.can_transition_to(next),
            "illegal page transition {} -> {} for {}",
            current,
            next,
            url
        );
        self.pages.insert(url.clone(), next);
    }
}

/// Ledger of image URLs dispatched for download
#[derive(Debug, Default)]
pub struct DownloadLedger {
    images: HashMap<Url, ImageState>,
}

impl DownloadLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `url` as dispatched if it never was
    ///
    /// Returns true exactly once per URL; the caller dispatches the download
    /// only on true.
    pub fn try_dispatch(&mut self, url: &Url) -> bool {
        if self.images.contains_key(url) {
            return false;
        }
        self.images.insert(url.clone(), ImageState::Dispatched);
        true
    }

    /// Records the terminal state of a dispatched download
    pub fn finish(&mut self, url: &Url, next: ImageState) {
        let current = self.state(url);
        debug_assert!(
            current.can_transition_to(next),
            "illegal image transition {} -> {} for {}",
            current,
            next,
            url
        );
        self.images.insert(url.clone(), next);
    }

    pub fn state(&self, url: &Url) -> ImageState {
        self.images.get(url).copied().unwrap_or(ImageState::Unknown)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Count of image URLs in each state
    pub fn state_counts(&self) -> HashMap<ImageState, u64> {
        count_states(self.images.values().copied())
    }
}

fn count_states<S: std::hash::Hash + Eq>(states: impl Iterator<Item = S>) -> HashMap<S, u64> {
    let mut counts = HashMap::new();
    for state in states {
        *counts.entry(state).or_insert(0) += 1;
    }
    counts
}
