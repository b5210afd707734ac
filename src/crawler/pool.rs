//! Bounded worker pool
//!
//! Every task is spawned immediately onto the tokio runtime but must hold a
//! permit from a shared semaphore while it runs, so at most `size` fetches
//! and downloads execute at once. Tasks waiting for a permit still count as
//! in flight.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

pub struct WorkerPool<T> {
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<T>,
    size: usize,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Creates a pool running at most `size` tasks at a time
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            tasks: JoinSet::new(),
            size,
        }
    }

    /// Submits a task; it starts once a permit is free
    pub fn submit<F>(&mut self, task: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        self.tasks.spawn(async move {
            // The semaphore is never closed, so acquisition only waits.
            let _permit = semaphore.acquire_owned().await.ok();
            task.await
        });
    }

    /// Waits for the next task to finish, in completion order
    ///
    /// Returns None when nothing is in flight.
    pub async fn next_completed(&mut self) -> Option<Result<T, JoinError>> {
        self.tasks.join_next().await
    }

    /// Tasks submitted and not yet collected
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_idle(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn size(&self) -> usize {
        self.size
    }
}
