//! Upscale orchestration
//!
//! `submit` validates the request on the caller's task and returns a job id.
//! Everything after that runs on a detached task:
//!
//! 1. wait on the memory gate
//! 2. re-fetch the source file and its folder through a fresh [`JobScope`]
//! 3. send the source bytes to the upscaler
//! 4. pick a free name and upload the result next to the source
//!
//! Outcomes are recorded in the [`JobTracker`]; nothing is reported back to the
//! submitting caller.

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use upscaler_core::config::DEFAULT_FILE_PREFIX;
use upscaler_core::models::{
    FileAddRequest, JobId, JobStatus, RequesterIdentity, StoredFile, UpscaleRequest, UpscaleResult,
};
use upscaler_core::{unique_name, AppError, LogLevel, UpscaleConfig};
use upscaler_infra::{GateSettings, ResourceGate, SysinfoMemorySampler};
use upscaler_storage::{JobScope, ScopeFactory};
use upscaler_vertex::{ImageUpscaler, PredictionClient, ServiceAccountTokenSource};

use crate::tracker::JobTracker;

/// Async locks serializing name resolution and upload per destination folder.
#[derive(Clone, Default)]
struct FolderLocks {
    locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl FolderLocks {
    async fn lock_for(&self, folder_id: Uuid) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(folder_id)
            .or_default()
            .clone()
    }

    /// Drop the lock for `folder_id` once no job holds or waits on it.
    async fn prune(&self, folder_id: Uuid) {
        let mut locks = self.locks.lock().await;
        if locks
            .get(&folder_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&folder_id);
        }
    }
}

/// Collaborators one detached job needs
#[derive(Clone)]
struct UpscaleJob {
    scopes: Arc<dyn ScopeFactory>,
    upscaler: Arc<dyn ImageUpscaler>,
    folder_locks: FolderLocks,
    file_prefix: String,
}

impl UpscaleJob {
    async fn run(
        self,
        file_id: Uuid,
        requester: RequesterIdentity,
        source_path: PathBuf,
    ) -> Result<StoredFile, AppError> {
        let scope = self.scopes.create_scope(requester);

        // The file may have been removed or moved while the job was waiting.
        let file = scope
            .files
            .get_file_by_id(file_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("file {}", file_id)))?;
        let folder_id = file
            .parent_folder_id
            .ok_or_else(|| AppError::NotFound(format!("parent folder of file {}", file_id)))?;
        if scope.files.get_folder(folder_id).await?.is_none() {
            return Err(AppError::NotFound(format!("folder {}", folder_id)));
        }

        let source = scope.blobs.read(&source_path).await?;
        let upscaled = self.upscaler.upscale(&source).await?;

        let result = UpscaleResult {
            bytes: upscaled,
            suggested_file_name: format!("{}{}", self.file_prefix, file.file_name),
        };

        let outcome = self.write_back(&scope, folder_id, result).await;
        self.folder_locks.prune(folder_id).await;
        outcome
    }

    async fn write_back(
        &self,
        scope: &JobScope,
        folder_id: Uuid,
        result: UpscaleResult,
    ) -> Result<StoredFile, AppError> {
        let lock = self.folder_locks.lock_for(folder_id).await;
        let _guard = lock.lock().await;

        let folder = scope
            .files
            .get_folder(folder_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("folder {}", folder_id)))?;

        let existing: HashSet<String> = folder.file_names.iter().cloned().collect();
        let file_name = unique_name(&existing, &result.suggested_file_name, true);

        let request = FileAddRequest {
            file_path: folder.child_path(&file_name),
            file_name,
            parent_folder_id: folder.id,
        };

        Ok(scope.uploads.upload_file(request, result.bytes).await?)
    }
}

/// Entry point for upscale requests
pub struct UpscaleOrchestrator {
    job: UpscaleJob,
    gate: ResourceGate,
    settings: GateSettings,
    tracker: JobTracker,
}

impl UpscaleOrchestrator {
    pub fn new(
        scopes: Arc<dyn ScopeFactory>,
        upscaler: Arc<dyn ImageUpscaler>,
        gate: ResourceGate,
        settings: GateSettings,
    ) -> Self {
        Self {
            job: UpscaleJob {
                scopes,
                upscaler,
                folder_locks: FolderLocks::default(),
                file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            },
            gate,
            settings,
            tracker: JobTracker::new(),
        }
    }

    /// Wire the production collaborators: host memory sampler, service-account
    /// token source and the hosted prediction endpoint.
    pub fn from_config(config: &UpscaleConfig, scopes: Arc<dyn ScopeFactory>) -> Result<Self> {
        let tokens = ServiceAccountTokenSource::from_config(config)
            .context("Failed to create service account token source")?;
        let client = PredictionClient::from_config(config, Arc::new(tokens))
            .context("Failed to create prediction client")?;

        tracing::info!(
            predict_url = %client.endpoint().predict_url(),
            upscale_factor = %config.upscale_factor,
            min_free_memory_bytes = config.min_free_memory_bytes,
            gate_timeout_policy = %config.gate_timeout_policy,
            "Upscale orchestrator configured"
        );

        let gate = ResourceGate::new(
            Arc::new(SysinfoMemorySampler::new()),
            config.gate_timeout_policy,
        );

        Ok(
            Self::new(scopes, Arc::new(client), gate, GateSettings::from_config(config))
                .with_file_prefix(config.file_prefix.clone()),
        )
    }

    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.job.file_prefix = prefix.into();
        self
    }

    pub fn with_tracker(mut self, tracker: JobTracker) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    pub async fn submit_request(&self, request: UpscaleRequest) -> Result<JobId, AppError> {
        self.submit(request.file_id, request.requester).await
    }

    /// Accept an upscale request and schedule it in the background.
    ///
    /// Fails with `NotFound` when `file_id` does not resolve; no job is created
    /// in that case. On success the returned id can be looked up in the tracker.
    #[tracing::instrument(skip(self, requester), fields(user_id = %requester.user_id))]
    pub async fn submit(
        &self,
        file_id: Uuid,
        requester: RequesterIdentity,
    ) -> Result<JobId, AppError> {
        let scope = self.job.scopes.create_scope(requester.clone());
        let file = scope
            .files
            .get_file_by_id(file_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("file {}", file_id)))?;
        let source_path = requester.physical_path_for(file.id);

        let job_id = Uuid::new_v4();
        self.tracker
            .update(job_id, JobStatus::WaitingForCapacity)
            .await;

        let job = self.job.clone();
        let gate = self.gate.clone();
        let settings = self.settings;
        let tracker = self.tracker.clone();

        tokio::spawn(async move {
            let running = tracker.clone();
            let work = tokio::spawn(async move {
                gate.run_when_ready(settings, move || async move {
                    running.update(job_id, JobStatus::Running).await;
                    job.run(file_id, requester, source_path).await
                })
                .await
                .and_then(|result| result)
            });

            // A panicking job must still leave a final status behind.
            let outcome = match work.await {
                Ok(outcome) => outcome,
                Err(e) => Err(AppError::Internal(format!("Upscale job panicked: {}", e))),
            };

            let status = match outcome {
                Ok(stored) => {
                    tracing::info!(
                        job_id = %job_id,
                        source_file_id = %file_id,
                        file_id = %stored.id,
                        file_name = %stored.file_name,
                        size_bytes = stored.size_bytes,
                        "Upscale job completed"
                    );
                    JobStatus::Completed {
                        file_id: stored.id,
                        file_name: stored.file_name,
                    }
                }
                Err(e) => {
                    log_job_error(job_id, file_id, &e);
                    JobStatus::Failed {
                        error_code: e.error_code().to_string(),
                        message: e.to_string(),
                    }
                }
            };

            tracker.finish(job_id, status).await;
        });

        tracing::info!(
            job_id = %job_id,
            file_id = %file_id,
            file_name = %file.file_name,
            "Upscale job submitted"
        );

        Ok(job_id)
    }
}

fn log_job_error(job_id: Uuid, file_id: Uuid, error: &AppError) {
    match error.log_level() {
        LogLevel::Debug => tracing::debug!(
            job_id = %job_id,
            file_id = %file_id,
            error_code = error.error_code(),
            error = %error,
            "Upscale job failed"
        ),
        LogLevel::Warn => tracing::warn!(
            job_id = %job_id,
            file_id = %file_id,
            error_code = error.error_code(),
            error = %error,
            "Upscale job failed"
        ),
        LogLevel::Error => tracing::error!(
            job_id = %job_id,
            file_id = %file_id,
            error_code = error.error_code(),
            error = %error,
            recoverable = error.is_recoverable(),
            "Upscale job failed"
        ),
    }
}
