//! Crawler coordinator - main crawl orchestration logic
//!
//! The coordinator owns every piece of mutable crawl state: the frontier,
//! the visited and downloaded ledgers, the worker pool and the manifest
//! writer. Workers only perform I/O and hand their results back through the
//! pool, so all dedup decisions happen in one place, one at a time.
//!
//! # Loop
//!
//! 1. Drain the frontier: every queued URL is marked visited and submitted
//!    as a fetch task.
//! 2. If the frontier is empty and nothing is in flight, stop.
//! 3. Wait for the next completion (or a shutdown signal).
//! 4. Page completions dispatch unseen images as download tasks and append
//!    unseen same-host links to the frontier; image completions append a
//!    manifest row.
//!
//! # Cancellation
//!
//! When the shutdown signal fires, queued URLs are dropped and nothing new
//! is admitted. Tasks already in flight run to completion: finished
//! downloads still get their manifest row, while links and images from
//! fetches that finish afterwards are discarded.

use crate::config::{validate, Config};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::frontier::{DownloadLedger, Frontier};
use crate::crawler::parser::{extract_page, ExtractedPage};
use crate::crawler::pool::WorkerPool;
use crate::crawler::store::{ImageStore, StoreOutcome};
use crate::output::{CrawlStatistics, ManifestWriter};
use crate::state::ImageState;
use crate::url::{parse_seed, same_origin_host};
use crate::{FetchError, StoreError, TrawlError};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use url::Url;

/// Completion of one unit of pool work
enum TaskOutcome {
    Page {
        url: Url,
        result: Result<ExtractedPage, FetchError>,
    },
    Image {
        image_url: Url,
        page_url: Url,
        result: Result<StoreOutcome, StoreError>,
    },
}

/// Main crawler coordinator structure
///
/// Constructed per crawl; nothing is shared between instances, so several
/// crawls can run side by side in one process.
pub struct Coordinator {
    seed: Url,
    fetcher: Arc<Fetcher>,
    store: Arc<ImageStore>,
    frontier: Frontier,
    downloads: DownloadLedger,
    pool: WorkerPool<TaskOutcome>,
    manifest: ManifestWriter,
    stats: CrawlStatistics,
    shutdown: Option<watch::Receiver<bool>>,
    cancelled: bool,
    pages_done: u64,
}

impl Coordinator {
    /// Creates a coordinator for one crawl
    ///
    /// This validates the configuration, parses the seed, makes sure the
    /// image directory is writable and truncates the manifest. Any failure
    /// here is fatal; nothing after this point aborts the crawl except a
    /// manifest write error.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `seed` - Absolute http(s) start URL
    pub fn new(config: Config, seed: &str) -> crate::Result<Self> {
        validate(&config)?;
        let seed = parse_seed(seed)?;

        let base_dir = PathBuf::from(&config.output.image_dir);
        ensure_writable_dir(&base_dir)?;

        let manifest = ManifestWriter::create(Path::new(&config.output.manifest_path))?;
        let fetcher = Arc::new(Fetcher::new(&config)?);
        let store = Arc::new(ImageStore::new(
            Arc::clone(&fetcher),
            base_dir,
            &config.images,
        ));

        let mut frontier = Frontier::new();
        frontier.push(seed.clone());

        Ok(Self {
            stats: CrawlStatistics::new(seed.as_str()),
            seed,
            fetcher,
            store,
            frontier,
            downloads: DownloadLedger::new(),
            pool: WorkerPool::new(config.crawler.max_workers as usize),
            manifest,
            shutdown: None,
            cancelled: false,
            pages_done: 0,
        })
    }

    /// Installs a shutdown signal; the crawl winds down once it reads `true`
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn seed(&self) -> &Url {
        &self.seed
    }

    /// Runs the crawl to quiescence (or to the end of a cancellation drain)
    pub async fn run(mut self) -> crate::Result<CrawlStatistics> {
        tracing::info!(
            "Starting crawl of {} with {} workers, images under {}",
            self.seed,
            self.pool.size(),
            self.store.base_dir().display()
        );

        loop {
            if !self.cancelled && self.shutdown_requested() {
                self.cancel();
            }
            if !self.cancelled {
                self.drain_frontier();
            }

            if self.is_quiescent() {
                break;
            }

            tokio::select! {
                biased;

                _ = wait_for_shutdown(&mut self.shutdown), if !self.cancelled => {
                    self.cancel();
                }
                joined = self.pool.next_completed() => match joined {
                    Some(Ok(outcome)) => self.handle_outcome(outcome)?,
                    Some(Err(e)) => tracing::error!("Worker task failed: {}", e),
                    None => {}
                },
            }
        }

        Ok(self.finish())
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Frontier empty and no task in flight, checked together
    fn is_quiescent(&self) -> bool {
        self.frontier.is_empty() && self.pool.is_idle()
    }

    /// Moves every queued URL into the pool, marking each visited
    fn drain_frontier(&mut self) {
        while let Some(url) = self.frontier.pop_for_dispatch() {
            tracing::debug!("Dispatching fetch for {}", url);
            let fetcher = Arc::clone(&self.fetcher);
            self.pool.submit(async move {
                let result = fetcher
                    .fetch_page(&url)
                    .await
                    .map(|page| extract_page(&page.body, &page.url));
                TaskOutcome::Page { url, result }
            });
        }
    }

    fn dispatch_download(&mut self, image_url: Url, page_url: Url) {
        tracing::debug!("Dispatching download of {} (from {})", image_url, page_url);
        let store = Arc::clone(&self.store);
        self.pool.submit(async move {
            let result = store.store(&image_url, &page_url).await;
            TaskOutcome::Image {
                image_url,
                page_url,
                result,
            }
        });
    }

    fn handle_outcome(&mut self, outcome: TaskOutcome) -> crate::Result<()> {
        match outcome {
            TaskOutcome::Page { url, result } => {
                self.handle_page(url, result);
                Ok(())
            }
            TaskOutcome::Image {
                image_url,
                page_url,
                result,
            } => self.handle_image(image_url, page_url, result),
        }
    }

    fn handle_page(&mut self, url: Url, result: Result<ExtractedPage, FetchError>) {
        self.pages_done += 1;
        if self.pages_done % 10 == 0 {
            tracing::info!(
                "Progress: {} pages fetched, {} queued, {} tasks in flight, {} images dispatched",
                self.pages_done,
                self.frontier.len(),
                self.pool.in_flight(),
                self.downloads.len()
            );
        }

        let extracted = match result {
            Ok(extracted) => {
                self.frontier.finish(&url, true);
                extracted
            }
            Err(e) => {
                self.frontier.finish(&url, false);
                if e.is_transient() {
                    tracing::warn!("Giving up on page: {}", e);
                } else {
                    tracing::warn!("Failed to fetch page: {}", e);
                }
                return;
            }
        };

        tracing::info!(
            "Scraped {}: {} images, {} links",
            url,
            extracted.images.len(),
            extracted.links.len()
        );

        if self.cancelled {
            tracing::debug!("Discarding discoveries from {} after shutdown", url);
            return;
        }

        for image_url in extracted.images {
            if self.downloads.try_dispatch(&image_url) {
                self.dispatch_download(image_url, url.clone());
            } else {
                self.stats.duplicate_images += 1;
                tracing::trace!("Image {} already dispatched", image_url);
            }
        }

        for link in extracted.links {
            if !same_origin_host(&self.seed, &link) {
                self.stats.offsite_links += 1;
                tracing::trace!("Ignoring off-host link {}", link);
                continue;
            }

            if self.frontier.push(link.clone()) {
                tracing::trace!("Enqueued {}", link);
            }
        }
    }

    fn handle_image(
        &mut self,
        image_url: Url,
        page_url: Url,
        result: Result<StoreOutcome, StoreError>,
    ) -> crate::Result<()> {
        match result {
            Ok(StoreOutcome::Stored(record)) => {
                self.downloads.finish(&image_url, ImageState::Stored);
                self.manifest.append(&record)?;
                tracing::info!(
                    "Downloaded: {} -> {}",
                    image_url,
                    record.local_path.display()
                );
            }
            Ok(StoreOutcome::Skipped { extension }) => {
                self.downloads.finish(&image_url, ImageState::Skipped);
                tracing::debug!("Skipped {} ({} excluded)", image_url, extension);
            }
            Err(e) => {
                self.downloads.finish(&image_url, ImageState::Failed);
                tracing::warn!("Failed to download image from {}: {}", page_url, e);
            }
        }
        Ok(())
    }

    fn cancel(&mut self) {
        self.cancelled = true;
        let dropped = self.frontier.clear_queue();
        tracing::warn!(
            "Shutdown requested: dropped {} queued pages, waiting for {} tasks in flight",
            dropped,
            self.pool.in_flight()
        );
    }

    fn finish(mut self) -> CrawlStatistics {
        self.stats.pages_by_state = self.frontier.state_counts();
        self.stats.images_by_state = self.downloads.state_counts();
        self.stats.manifest_rows = self.manifest.rows();
        self.stats.finished_at = Utc::now();
        self.stats.cancelled = self.cancelled;

        tracing::info!(
            "Crawl {}: {} pages fetched, {} images stored, manifest at {} ({} rows) in {}s",
            if self.cancelled { "cancelled" } else { "completed" },
            self.pages_done,
            self.stats.images(ImageState::Stored),
            self.manifest.path().display(),
            self.stats.manifest_rows,
            self.stats.duration_seconds()
        );

        self.stats
    }
}

/// Resolves once the shutdown flag reads `true`
///
/// Never resolves if no signal is installed or its sender went away
/// without firing.
async fn wait_for_shutdown(shutdown: &mut Option<watch::Receiver<bool>>) {
    let Some(rx) = shutdown else {
        return std::future::pending().await;
    };

    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}

/// Creates the image root and proves it accepts files
fn ensure_writable_dir(dir: &Path) -> crate::Result<()> {
    let fail = |source| TrawlError::BaseDir {
        path: dir.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(fail)?;
    let probe = dir.join(".image-trawler-probe");
    std::fs::write(&probe, b"").map_err(fail)?;
    std::fs::remove_file(&probe).map_err(fail)?;
    Ok(())
}
