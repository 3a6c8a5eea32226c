//! Storage collaborator traits
//!
//! The upscale pipeline does not own file persistence. It talks to storage
//! through these traits: a metadata repository, an upload service and a byte
//! store for reading the original file.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

use upscaler_core::models::{FileAddRequest, Folder, StoredFile};
use upscaler_core::AppError;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Name already taken: {0}")]
    Conflict(String),

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => AppError::NotFound(what),
            StorageError::IoError(e) => AppError::from(e),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// File and folder metadata lookups
#[async_trait]
pub trait FilesRepository: Send + Sync {
    /// Fetch a file by id; `None` if it does not exist (any more).
    async fn get_file_by_id(&self, id: Uuid) -> StorageResult<Option<StoredFile>>;

    /// Fetch a folder with the names of its current files.
    async fn get_folder(&self, id: Uuid) -> StorageResult<Option<Folder>>;
}

/// Upload service: persists bytes and registers the new file in its folder
#[async_trait]
pub trait FileUploads: Send + Sync {
    /// Store `data` as a new file described by `request`.
    ///
    /// Fails with `Conflict` if the folder already holds a file with that name.
    async fn upload_file(&self, request: FileAddRequest, data: Vec<u8>)
        -> StorageResult<StoredFile>;
}

/// Physical byte retrieval
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read the complete contents stored at `path`.
    async fn read(&self, path: &Path) -> StorageResult<Vec<u8>>;
}
