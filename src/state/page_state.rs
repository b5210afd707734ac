/// Lifecycle states for pages and images within a single crawl
///
/// Pages move `Undiscovered -> Enqueued -> InFlight -> {Completed, Failed}`.
/// Images move `Unknown -> Dispatched -> {Stored, Skipped, Failed}`.
use std::fmt;

/// Represents the current state of a page URL in the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    /// Never seen on any page
    Undiscovered,

    /// Sitting in the frontier waiting for a worker
    Enqueued,

    /// Fetch dispatched; the URL is now permanently visited
    InFlight,

    /// Fetched and extracted successfully
    Completed,

    /// Fetch failed; the page is a dead end
    Failed,
}

impl PageState {
    /// Returns true if no further processing will happen for this page
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` is a legal step
    pub fn can_transition_to(&self, next: PageState) -> bool {
        matches!(
            (self, next),
            (Self::Undiscovered, Self::Enqueued)
                | (Self::Enqueued, Self::InFlight)
                | (Self::InFlight, Self::Completed)
                | (Self::InFlight, Self::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undiscovered => "undiscovered",
            Self::Enqueued => "enqueued",
            Self::InFlight => "in_flight",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents the current state of an image URL in the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageState {
    /// Never referenced by a fetched page
    Unknown,

    /// Download dispatched; the URL is now permanently in the downloaded set
    Dispatched,

    /// Written to disk and recorded in the manifest
    Stored,

    /// Deliberately not downloaded (excluded extension)
    Skipped,

    /// Download or filesystem failure
    Failed,
}

impl ImageState {
    /// Returns true if no further processing will happen for this image
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stored | Self::Skipped | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` is a legal step
    pub fn can_transition_to(&self, next: ImageState) -> bool {
        matches!(
            (self, next),
            (Self::Unknown, Self::Dispatched)
                | (Self::Dispatched, Self::Stored)
                | (Self::Dispatched, Self::Skipped)
                | (Self::Dispatched, Self::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Dispatched => "dispatched",
            Self::Stored => "stored",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ImageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
