//! Bounded worker pool for batch submissions
//!
//! Submissions are accepted immediately and executed on spawned tasks, with
//! a semaphore capping how many batches run at once. The default pool size
//! is one worker, which serializes batches in submission order on an
//! uncontended runtime. Handles stay joinable so tests and shutdown paths
//! can wait for specific jobs or for everything in flight.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Spawns batch work under a concurrency cap. Cheap to clone; clones share
/// the pool.
#[derive(Clone)]
pub struct BatchRunner {
    semaphore: Arc<Semaphore>,
    handles: Arc<Mutex<HashMap<Uuid, JoinHandle<()>>>>,
    worker_count: usize,
}

impl BatchRunner {
    pub fn new(worker_count: usize) -> Self {
        // A zero-sized pool would accept jobs that can never run.
        let worker_count = worker_count.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(worker_count)),
            handles: Arc::new(Mutex::new(HashMap::new())),
            worker_count,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Workers not currently occupied by a running batch
    pub fn available_workers(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Queue a batch. Returns once the task is spawned; the work itself
    /// starts when a worker permit frees up.
    pub async fn spawn(&self, job_id: Uuid, work: impl Future<Output = ()> + Send + 'static) {
        let semaphore = self.semaphore.clone();
        let handle = tokio::spawn(async move {
            // The semaphore is never closed, so acquisition cannot fail.
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            tracing::debug!(%job_id, "batch worker started");
            work.await;
            tracing::debug!(%job_id, "batch worker finished");
        });
        self.handles.lock().await.insert(job_id, handle);
    }

    /// Wait for one job's task to finish. Returns false when the job was
    /// never spawned or has already been joined.
    pub async fn join(&self, job_id: Uuid) -> bool {
        let handle = self.handles.lock().await.remove(&job_id);
        match handle {
            Some(handle) => {
                if let Err(e) = handle.await {
                    tracing::error!(%job_id, error = %e, "batch task panicked");
                }
                true
            },
            None => false,
        }
    }

    /// Wait for every spawned batch still tracked by this runner
    pub async fn drain(&self) {
        let handles: Vec<(Uuid, JoinHandle<()>)> =
            self.handles.lock().await.drain().collect();
        let (job_ids, joins): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        for (job_id, result) in job_ids
            .into_iter()
            .zip(futures::future::join_all(joins).await)
        {
            if let Err(e) = result {
                tracing::error!(%job_id, error = %e, "batch task panicked");
            }
        }
    }
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new(1)
    }
}
