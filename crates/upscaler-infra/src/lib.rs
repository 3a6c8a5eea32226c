//! Upscaler Infrastructure Library
//!
//! This crate provides shared infrastructure components used by the upscale pipeline:
//! - Memory-gated admission control for heavy jobs
//! - Host memory sampling
//! - Tracing initialization

#[cfg(feature = "observability-basic")]
pub mod telemetry;

#[cfg(feature = "capacity")]
pub mod capacity;

// Re-export commonly used types
#[cfg(feature = "observability-basic")]
pub use telemetry::init_telemetry;

#[cfg(feature = "capacity")]
pub use capacity::{Admission, GateSettings, ResourceGate, SysinfoMemorySampler};
