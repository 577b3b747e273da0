// src/tasks/mod.rs

//! Background job tracking.
//! Every classification that outlives its webhook request runs as a task
//! registered here under its job id, so shutdown can wait for it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub mod metrics;

pub use metrics::{JobMetrics, MetricsSnapshot};

#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<Mutex<HashMap<String, (u64, JoinHandle<()>)>>>,
    next_generation: Arc<AtomicU64>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` in the background under `job_id`; the entry is removed when it finishes.
    /// Re-registering an id replaces the entry, and the replaced task leaves the new one in place.
    pub fn spawn<F>(&self, job_id: impl Into<String>, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let job_id = job_id.into();
        let key = job_id.clone();
        let jobs = self.jobs.clone();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let (registered_tx, registered_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            // The entry must exist before the task can remove it
            let _ = registered_rx.await;
            work.await;
            let mut jobs = jobs.lock();
            if jobs.get(&key).is_some_and(|(current, _)| *current == generation) {
                jobs.remove(&key);
            }
        });

        let replaced = self.jobs.lock().insert(job_id.clone(), (generation, handle));
        let _ = registered_tx.send(());
        if replaced.is_some() {
            warn!(job_id = %job_id, "Replaced an existing job with the same id");
        }
    }

    pub fn pending(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn pending_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.jobs.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Wait up to `grace` for every pending job, then abort what is left.
    /// Returns the number of jobs that had to be aborted.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        let handles: Vec<(String, JoinHandle<()>)> = self
            .jobs
            .lock()
            .drain()
            .map(|(id, (_, handle))| (id, handle))
            .collect();
        if handles.is_empty() {
            return 0;
        }

        info!("Waiting up to {:?} for {} pending jobs", grace, handles.len());
        let aborts: Vec<_> = handles.iter().map(|(_, h)| h.abort_handle()).collect();
        let joins = futures::future::join_all(handles.into_iter().map(|(id, handle)| async move {
            if let Err(e) = handle.await {
                warn!(job_id = %id, error = %e, "Job task ended abnormally");
            }
        }));

        match tokio::time::timeout(grace, joins).await {
            Ok(_) => {
                info!("All pending jobs finished");
                0
            }
            Err(_) => {
                let unfinished = aborts.iter().filter(|a| !a.is_finished()).count();
                for abort in &aborts {
                    abort.abort();
                }
                warn!("Aborted {} jobs still running after {:?}", unfinished, grace);
                unfinished
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_finished_jobs_leave_registry() {
        let registry = JobRegistry::new();
        let (tx, rx) = oneshot::channel::<()>();
        registry.spawn("run_1", async move {
            let _ = rx.await;
        });
        assert_eq!(registry.pending_ids(), vec!["run_1".to_string()]);

        tx.send(()).unwrap();
        for _ in 0..100 {
            if registry.pending() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(registry.pending(), 0);
    }

    #[tokio::test]
    async fn test_replaced_job_does_not_remove_its_successor() {
        let registry = JobRegistry::new();
        let (first_tx, first_rx) = oneshot::channel::<()>();
        let (first_done_tx, first_done_rx) = oneshot::channel::<()>();
        registry.spawn("run_1", async move {
            let _ = first_rx.await;
            let _ = first_done_tx.send(());
        });
        let (second_tx, second_rx) = oneshot::channel::<()>();
        registry.spawn("run_1", async move {
            let _ = second_rx.await;
        });

        first_tx.send(()).unwrap();
        first_done_rx.await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(registry.pending_ids(), vec!["run_1".to_string()]);

        second_tx.send(()).unwrap();
        assert_eq!(registry.shutdown(Duration::from_secs(5)).await, 0);
        assert_eq!(registry.pending(), 0);
    }

    #[tokio::test]
    async fn test_instant_job_is_removed() {
        let registry = JobRegistry::new();
        registry.spawn("run_fast", async {});
        for _ in 0..100 {
            if registry.pending() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(registry.pending(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_jobs() {
        let registry = JobRegistry::new();
        let done = Arc::new(Mutex::new(false));
        let flag = done.clone();
        registry.spawn("run_1", async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            *flag.lock() = true;
        });

        let aborted = registry.shutdown(Duration::from_secs(5)).await;
        assert_eq!(aborted, 0);
        assert!(*done.lock());
    }

    #[tokio::test]
    async fn test_shutdown_aborts_stuck_jobs() {
        let registry = JobRegistry::new();
        registry.spawn("run_stuck", std::future::pending::<()>());
        registry.spawn("run_quick", async {});

        let aborted = registry.shutdown(Duration::from_millis(50)).await;
        assert_eq!(aborted, 1);
        assert_eq!(registry.pending(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_with_nothing_pending() {
        assert_eq!(JobRegistry::new().shutdown(Duration::from_millis(1)).await, 0);
    }
}
