// src/store/registry.rs
use std::collections::HashMap;
use tokio::sync::{watch, Mutex};
use tracing::warn;

use crate::models::{Job, Result};
use crate::store::JobStore;

/// In-memory mirror of live jobs plus their cancellation handles.
///
/// The database remains the source of truth. The mirror exists so that
/// progress polls don't hit SQLite on every read and so a running job can
/// be cancelled without a store round-trip. The runner refreshes snapshots
/// after every store mutation; a miss falls back to the store and
/// non-terminal rows re-enter the mirror.
pub struct JobRegistry {
    store: JobStore,
    jobs: Mutex<HashMap<String, Job>>,
    cancels: Mutex<HashMap<String, watch::Sender<bool>>>,
}

impl JobRegistry {
    pub fn new(store: JobStore) -> Self {
        Self {
            store,
            jobs: Mutex::new(HashMap::new()),
            cancels: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a job for tracking and hands back its cancellation signal.
    pub async fn track(&self, job: &Job) -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(false);
        self.jobs.lock().await.insert(job.id.clone(), job.clone());
        self.cancels.lock().await.insert(job.id.clone(), tx);
        rx
    }

    pub async fn get(&self, job_id: &str) -> Result<Option<Job>> {
        if let Some(job) = self.jobs.lock().await.get(job_id).cloned() {
            return Ok(Some(job));
        }
        self.sync_job(job_id).await
    }

    /// Reloads one job from the store and refreshes the mirror.
    pub async fn sync_job(&self, job_id: &str) -> Result<Option<Job>> {
        let job = self.store.get_job(job_id).await?;
        match &job {
            Some(job) if !job.status.is_terminal() => {
                self.jobs.lock().await.insert(job.id.clone(), job.clone());
            }
            _ => {
                self.jobs.lock().await.remove(job_id);
            }
        }
        Ok(job)
    }

    /// Signals a running job to stop. Returns false when the job is not
    /// live here (already finished, or owned by another process).
    pub async fn cancel(&self, job_id: &str) -> bool {
        match self.cancels.lock().await.get(job_id) {
            Some(tx) => {
                warn!("🛑 Cancellation requested for job {}", job_id);
                tx.send(true).is_ok()
            }
            None => false,
        }
    }

    pub async fn is_cancelled(&self, job_id: &str) -> bool {
        match self.cancels.lock().await.get(job_id) {
            Some(tx) => *tx.borrow(),
            None => false,
        }
    }

    /// Drops the snapshot and cancellation handle once a job is terminal.
    pub async fn release(&self, job_id: &str) {
        self.jobs.lock().await.remove(job_id);
        self.cancels.lock().await.remove(job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_db_pool;
    use crate::models::{JobSpec, JobStatus};

    fn job(name: &str) -> Job {
        Job::new(
            &JobSpec {
                owner_id: "owner-1".to_string(),
                name: name.to_string(),
                sheet_url: None,
                column_name: None,
                urls: Vec::new(),
            },
            2,
        )
    }

    #[tokio::test]
    async fn test_mirror_serves_tracked_jobs() {
        let store = JobStore::new(test_db_pool().await);
        let registry = JobRegistry::new(store);

        let job = job("tracked");
        registry.track(&job).await;

        // Never persisted, yet readable through the mirror.
        let snapshot = registry.get(&job.id).await.unwrap().unwrap();
        assert_eq!(snapshot.name, "tracked");
    }

    #[tokio::test]
    async fn test_miss_reloads_from_store() {
        let pool = test_db_pool().await;
        let store = JobStore::new(pool.clone());
        let registry = JobRegistry::new(JobStore::new(pool));

        let job = job("persisted");
        store.create_job(&job).await.unwrap();

        let snapshot = registry.get(&job.id).await.unwrap().unwrap();
        assert_eq!(snapshot.id, job.id);
        assert_eq!(snapshot.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_cancel_flips_watch_signal() {
        let store = JobStore::new(test_db_pool().await);
        let registry = JobRegistry::new(store);

        let job = job("cancellable");
        let mut rx = registry.track(&job).await;

        assert!(!registry.is_cancelled(&job.id).await);
        assert!(registry.cancel(&job.id).await);
        assert!(registry.is_cancelled(&job.id).await);

        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn test_cancel_unknown_job_is_refused() {
        let store = JobStore::new(test_db_pool().await);
        let registry = JobRegistry::new(store);
        assert!(!registry.cancel("missing").await);
    }

    #[tokio::test]
    async fn test_release_removes_live_state() {
        let store = JobStore::new(test_db_pool().await);
        let registry = JobRegistry::new(store);

        let job = job("released");
        registry.track(&job).await;
        registry.release(&job.id).await;

        assert!(registry.get(&job.id).await.unwrap().is_none());
        assert!(!registry.cancel(&job.id).await);
    }
}
