//! Upscaler Core Library
//!
//! This crate provides the domain models, error type, configuration and naming
//! rules shared by all upscaler components.

pub mod capacity_gate;
pub mod config;
pub mod error;
pub mod models;
pub mod naming;

// Re-export commonly used types
pub use capacity_gate::MemorySampler;
pub use config::{GateTimeoutPolicy, UpscaleConfig, UpscaleFactor};
pub use error::{AppError, LogLevel};
pub use naming::unique_name;
