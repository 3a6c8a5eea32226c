//! Upscaler Storage Library
//!
//! This crate defines the storage collaborator traits the upscale pipeline
//! consumes, the per-job scope that bundles them, and a local filesystem
//! implementation.
//!
//! # Physical layout
//!
//! The local backend stores the bytes of every file at
//! `{physical_storage_path}/{file_id}`, where `physical_storage_path` comes from
//! the requester identity and must live under the backend's base directory.

#[cfg(feature = "storage-local")]
pub mod local;
pub mod scope;
pub mod traits;

// Re-export commonly used types
#[cfg(feature = "storage-local")]
pub use local::{LocalScopeFactory, LocalStorage, LocalUploads};
pub use scope::{JobScope, ScopeFactory};
pub use traits::{BlobStore, FileUploads, FilesRepository, StorageError, StorageResult};
