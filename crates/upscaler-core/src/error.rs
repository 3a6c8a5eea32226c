//! Error types module
//!
//! This module provides the core error type shared by every upscaler crate.
//! Errors raised while validating a request surface to the caller; errors
//! raised inside a detached upscale job are logged at `log_level()` and recorded
//! on the job's status instead.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like a missing file
    Debug,
    /// Warning level - for recoverable issues like resource limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Remote service returned {status}: {body}")]
    RemoteService { status: u16, body: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient memory: {available} bytes available, {required} bytes required")]
    InsufficientMemory { available: u64, required: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Machine-readable error code (e.g., "REMOTE_SERVICE_ERROR")
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Credential(_) => "CREDENTIAL_ERROR",
            AppError::RemoteService { .. } => "REMOTE_SERVICE_ERROR",
            AppError::Protocol(_) => "PROTOCOL_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::InsufficientMemory { .. } => "INSUFFICIENT_MEMORY",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether resubmitting the same request may succeed.
    ///
    /// Nothing in this workspace retries on its own; this is a hint for callers.
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::RemoteService { status, .. } => *status == 429 || *status >= 500,
            AppError::Storage(_) | AppError::InsufficientMemory { .. } | AppError::Internal(_) => {
                true
            }
            AppError::NotFound(_)
            | AppError::Credential(_)
            | AppError::Protocol(_)
            | AppError::InvalidInput(_) => false,
        }
    }

    /// Log level for this error
    pub fn log_level(&self) -> LogLevel {
        match self {
            AppError::NotFound(_) | AppError::InvalidInput(_) => LogLevel::Debug,
            AppError::InsufficientMemory { .. } => LogLevel::Warn,
            AppError::RemoteService { status, .. } if *status < 500 => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => AppError::NotFound(format!("IO error: {}", err)),
            _ => AppError::Storage(format!("IO error: {}", err)),
        }
    }
}
