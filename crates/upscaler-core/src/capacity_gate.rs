//! Memory sampler trait for the resource gate.
//!
//! Implementations report how much memory the host can currently spare. The
//! gate polls a sampler before admitting memory-heavy jobs; tests substitute a
//! scripted sampler for the real host reading.

use async_trait::async_trait;

/// Source of the host's available-memory reading.
#[async_trait]
pub trait MemorySampler: Send + Sync {
    /// Bytes of memory currently available to new work.
    async fn available_memory_bytes(&self) -> u64;
}
