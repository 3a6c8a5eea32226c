use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use sysinfo::System;
use tracing::error;

use upscaler_core::MemorySampler;

/// Host memory sampler backed by `sysinfo`
#[derive(Clone)]
pub struct SysinfoMemorySampler {
    system: Arc<Mutex<System>>,
}

impl SysinfoMemorySampler {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_memory();

        Self {
            system: Arc::new(Mutex::new(system)),
        }
    }

    fn sample(&self) -> u64 {
        match self.system.lock() {
            Ok(mut system) => {
                system.refresh_memory();
                system.available_memory()
            }
            Err(e) => {
                error!(error = %e, "Failed to acquire system lock for memory check");
                0
            }
        }
    }
}

impl Default for SysinfoMemorySampler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemorySampler for SysinfoMemorySampler {
    /// Reads host memory in spawn_blocking to avoid blocking the runtime.
    ///
    /// A failed reading counts as zero available bytes, so the gate keeps
    /// waiting rather than admitting work blindly.
    async fn available_memory_bytes(&self) -> u64 {
        let sampler = self.clone();
        tokio::task::spawn_blocking(move || sampler.sample())
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "spawn_blocking for memory check failed");
                0
            })
    }
}
