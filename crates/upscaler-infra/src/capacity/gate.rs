use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use upscaler_core::{AppError, GateTimeoutPolicy, MemorySampler, UpscaleConfig};

/// Thresholds for one gate evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateSettings {
    /// Minimum available memory before a job is admitted
    pub threshold_bytes: u64,
    pub poll_interval: Duration,
    /// Upper bound on the total wait before the timeout policy applies
    pub max_wait: Duration,
}

impl GateSettings {
    pub fn from_config(config: &UpscaleConfig) -> Self {
        Self {
            threshold_bytes: config.min_free_memory_bytes,
            poll_interval: config.memory_poll_interval(),
            max_wait: config.memory_max_wait(),
        }
    }
}

/// Result of waiting on the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Memory reached the threshold
    Admitted { available: u64, waited: Duration },
    /// `max_wait` elapsed first
    TimedOut { available: u64, waited: Duration },
}

/// Admission gate holding memory-heavy work until the host has room for it.
///
/// Each call polls independently; there is no queue and no ordering between
/// concurrent callers.
#[derive(Clone)]
pub struct ResourceGate {
    sampler: Arc<dyn MemorySampler>,
    policy: GateTimeoutPolicy,
}

impl ResourceGate {
    pub fn new(sampler: Arc<dyn MemorySampler>, policy: GateTimeoutPolicy) -> Self {
        Self { sampler, policy }
    }

    /// Run `job` once enough memory is available or `max_wait` has elapsed.
    ///
    /// `job` is invoked at most once. Under [`GateTimeoutPolicy::Abort`] a
    /// timed-out wait returns `InsufficientMemory` without invoking it.
    pub async fn run_when_ready<F, Fut, T>(&self, settings: GateSettings, job: F) -> Result<T, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        match self.wait_for_memory(settings).await {
            Admission::Admitted { available, waited } => {
                info!(
                    available_bytes = available,
                    threshold_bytes = settings.threshold_bytes,
                    waited_ms = waited.as_millis() as u64,
                    "Memory gate admitted job"
                );
                Ok(job().await)
            }
            Admission::TimedOut { available, waited } => match self.policy {
                GateTimeoutPolicy::RunAnyway => {
                    warn!(
                        available_bytes = available,
                        threshold_bytes = settings.threshold_bytes,
                        waited_ms = waited.as_millis() as u64,
                        "Memory gate timed out, running job anyway"
                    );
                    Ok(job().await)
                }
                GateTimeoutPolicy::Abort => {
                    warn!(
                        available_bytes = available,
                        threshold_bytes = settings.threshold_bytes,
                        waited_ms = waited.as_millis() as u64,
                        "Memory gate timed out, job aborted"
                    );
                    Err(AppError::InsufficientMemory {
                        available,
                        required: settings.threshold_bytes,
                    })
                }
            },
        }
    }

    /// Poll the sampler until the threshold is met or `max_wait` elapses.
    pub async fn wait_for_memory(&self, settings: GateSettings) -> Admission {
        let start = Instant::now();

        loop {
            let available = self.sampler.available_memory_bytes().await;
            let waited = start.elapsed();

            if available >= settings.threshold_bytes {
                return Admission::Admitted { available, waited };
            }

            if waited >= settings.max_wait {
                return Admission::TimedOut { available, waited };
            }

            debug!(
                available_bytes = available,
                threshold_bytes = settings.threshold_bytes,
                waited_ms = waited.as_millis() as u64,
                "Waiting for free memory"
            );

            sleep(settings.poll_interval.min(settings.max_wait - waited)).await;
        }
    }
}
