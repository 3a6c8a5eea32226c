//! In-memory job status registry
//!
//! Statuses live only as long as the process; nothing is persisted. Finished
//! jobs stay visible for a retention period and are evicted after that, or
//! earlier through [`JobTracker::take_finished`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

use upscaler_core::models::JobStatus;

/// How long a finished job stays queryable by default.
pub const DEFAULT_FINISHED_RETENTION: Duration = Duration::from_secs(60 * 60);

/// Optional sender notified with the final status of every job.
pub type JobFinishedSender = mpsc::Sender<(Uuid, JobStatus)>;

struct Entry {
    status: JobStatus,
    finished_at: Option<Instant>,
}

#[derive(Clone)]
pub struct JobTracker {
    entries: Arc<RwLock<HashMap<Uuid, Entry>>>,
    finished_tx: Option<JobFinishedSender>,
    retention: Duration,
}

impl Default for JobTracker {
    fn default() -> Self {
        Self {
            entries: Arc::default(),
            finished_tx: None,
            retention: DEFAULT_FINISHED_RETENTION,
        }
    }
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker that also sends `(job_id, status)` once a job finishes.
    pub fn with_finished_sender(finished_tx: JobFinishedSender) -> Self {
        Self {
            finished_tx: Some(finished_tx),
            ..Self::default()
        }
    }

    /// Keep finished jobs for `retention` instead of the default hour.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub async fn status(&self, job_id: Uuid) -> Option<JobStatus> {
        self.entries
            .read()
            .await
            .get(&job_id)
            .map(|entry| entry.status.clone())
    }

    /// Record an intermediate status. Finished jobs are left untouched.
    pub async fn update(&self, job_id: Uuid, status: JobStatus) {
        let mut entries = self.entries.write().await;
        match entries.get(&job_id) {
            Some(current) if current.status.is_finished() => {
                tracing::warn!(
                    job_id = %job_id,
                    current = %current.status,
                    requested = %status,
                    "Ignoring status change for finished job"
                );
            }
            _ => {
                entries.insert(
                    job_id,
                    Entry {
                        status,
                        finished_at: None,
                    },
                );
            }
        }
    }

    /// Record the final status, evict expired jobs and notify the finished
    /// channel, if any.
    pub async fn finish(&self, job_id: Uuid, status: JobStatus) {
        let now = Instant::now();
        {
            let mut entries = self.entries.write().await;
            entries.insert(
                job_id,
                Entry {
                    status: status.clone(),
                    finished_at: Some(now),
                },
            );
            Self::evict_expired_locked(&mut entries, now, self.retention);
        }

        if let Some(ref tx) = self.finished_tx {
            // A dropped receiver only means nobody is listening.
            let _ = tx.send((job_id, status)).await;
        }
    }

    /// Remove and return the status of a finished job. Jobs still waiting or
    /// running are left in place and yield `None`.
    pub async fn take_finished(&self, job_id: Uuid) -> Option<JobStatus> {
        let mut entries = self.entries.write().await;
        if entries.get(&job_id)?.finished_at.is_none() {
            return None;
        }
        entries.remove(&job_id).map(|entry| entry.status)
    }

    /// Drop finished jobs older than the retention period. Returns how many were removed.
    pub async fn evict_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        Self::evict_expired_locked(&mut entries, Instant::now(), self.retention)
    }

    fn evict_expired_locked(
        entries: &mut HashMap<Uuid, Entry>,
        now: Instant,
        retention: Duration,
    ) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| match entry.finished_at {
            Some(finished_at) => now.duration_since(finished_at) < retention,
            None => true,
        });
        let evicted = before - entries.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = entries.len(), "Evicted finished jobs");
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
