use crate::scope::{JobScope, ScopeFactory};
use crate::traits::{BlobStore, FileUploads, FilesRepository, StorageError, StorageResult};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use uuid::Uuid;

use upscaler_core::models::{FileAddRequest, Folder, RequesterIdentity, StoredFile};

#[derive(Default)]
struct Index {
    files: HashMap<Uuid, StoredFile>,
    folders: HashMap<Uuid, Folder>,
}

/// Local filesystem storage implementation
///
/// File and folder metadata live in memory; file bytes live on disk under
/// `base_path`. Clones share the same index.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    index: Arc<RwLock<Index>>,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory every physical storage path must live under
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            index: Arc::new(RwLock::new(Index::default())),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Register an empty folder at the given logical path.
    pub async fn register_folder(&self, folder_path: &str) -> Folder {
        let folder = Folder {
            id: Uuid::new_v4(),
            folder_path: folder_path.to_string(),
            file_names: Vec::new(),
        };
        self.index
            .write()
            .await
            .folders
            .insert(folder.id, folder.clone());
        folder
    }

    /// Remove a file's metadata and bytes. Returns false if it was not present.
    pub async fn remove_file(&self, identity: &RequesterIdentity, id: Uuid) -> StorageResult<bool> {
        let removed = {
            let mut index = self.index.write().await;
            let removed = index.files.remove(&id);
            if let Some(file) = &removed {
                if let Some(folder) = file
                    .parent_folder_id
                    .and_then(|folder_id| index.folders.get_mut(&folder_id))
                {
                    folder.file_names.retain(|name| name != &file.file_name);
                }
            }
            removed
        };

        if removed.is_none() {
            return Ok(false);
        }

        let path = self.checked_path(&identity.physical_path_for(id))?;
        if fs::try_exists(&path).await.unwrap_or(false) {
            fs::remove_file(&path).await?;
        }

        tracing::info!(file_id = %id, "Local storage file removed");
        Ok(true)
    }

    /// Unregister a folder. Files inside keep their metadata and bytes but
    /// lose their parent. Returns false if the folder was not present.
    pub async fn remove_folder(&self, folder_id: Uuid) -> bool {
        let mut index = self.index.write().await;
        if index.folders.remove(&folder_id).is_none() {
            return false;
        }
        for file in index.files.values_mut() {
            if file.parent_folder_id == Some(folder_id) {
                file.parent_folder_id = None;
            }
        }

        tracing::info!(folder_id = %folder_id, "Local storage folder removed");
        true
    }

    /// Move a file into another folder, keeping its name and bytes.
    pub async fn move_file(&self, file_id: Uuid, folder_id: Uuid) -> StorageResult<StoredFile> {
        let mut guard = self.index.write().await;
        let index = &mut *guard;

        let file = index
            .files
            .get_mut(&file_id)
            .ok_or_else(|| StorageError::NotFound(format!("file {}", file_id)))?;
        let target = index
            .folders
            .get_mut(&folder_id)
            .ok_or_else(|| StorageError::NotFound(format!("folder {}", folder_id)))?;
        if target.file_names.iter().any(|n| n == &file.file_name) {
            return Err(StorageError::Conflict(file.file_name.clone()));
        }
        target.file_names.push(file.file_name.clone());
        let new_path = target.child_path(&file.file_name);

        if let Some(source) = file
            .parent_folder_id
            .and_then(|id| index.folders.get_mut(&id))
        {
            source.file_names.retain(|n| n != &file.file_name);
        }

        file.parent_folder_id = Some(folder_id);
        file.file_path = new_path;

        tracing::info!(file_id = %file_id, folder_id = %folder_id, "Local storage file moved");
        Ok(file.clone())
    }

    /// Uploads bound to the given requester's physical storage.
    pub fn scoped(&self, identity: RequesterIdentity) -> LocalUploads {
        LocalUploads {
            storage: self.clone(),
            identity,
        }
    }

    /// Validate that `path` stays inside the storage root.
    fn checked_path(&self, path: &Path) -> StorageResult<PathBuf> {
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(StorageError::InvalidPath(
                "Storage path contains parent directory references".to_string(),
            ));
        }

        if !path.starts_with(&self.base_path) {
            return Err(StorageError::InvalidPath(format!(
                "{} resolves outside storage directory",
                path.display()
            )));
        }

        Ok(path.to_path_buf())
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl FilesRepository for LocalStorage {
    async fn get_file_by_id(&self, id: Uuid) -> StorageResult<Option<StoredFile>> {
        Ok(self.index.read().await.files.get(&id).cloned())
    }

    async fn get_folder(&self, id: Uuid) -> StorageResult<Option<Folder>> {
        Ok(self.index.read().await.folders.get(&id).cloned())
    }
}

#[async_trait]
impl BlobStore for LocalStorage {
    async fn read(&self, path: &Path) -> StorageResult<Vec<u8>> {
        let path = self.checked_path(path)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(path.display().to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::ReadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage read successful"
        );

        Ok(data)
    }
}

/// Upload service writing into one requester's physical storage
#[derive(Clone)]
pub struct LocalUploads {
    storage: LocalStorage,
    identity: RequesterIdentity,
}

#[async_trait]
impl FileUploads for LocalUploads {
    async fn upload_file(
        &self,
        request: FileAddRequest,
        data: Vec<u8>,
    ) -> StorageResult<StoredFile> {
        let id = Uuid::new_v4();
        let path = self
            .storage
            .checked_path(&self.identity.physical_path_for(id))?;
        let size = data.len();

        // Reserve the name first so a concurrent upload cannot take it.
        {
            let mut index = self.storage.index.write().await;
            let folder = index
                .folders
                .get_mut(&request.parent_folder_id)
                .ok_or_else(|| {
                    StorageError::NotFound(format!("folder {}", request.parent_folder_id))
                })?;
            if folder.file_names.iter().any(|n| n == &request.file_name) {
                return Err(StorageError::Conflict(request.file_name));
            }
            folder.file_names.push(request.file_name.clone());
        }

        let start = std::time::Instant::now();
        if let Err(e) = self.write_bytes(&path, &data).await {
            discard_partial(&path).await;
            let mut index = self.storage.index.write().await;
            if let Some(folder) = index.folders.get_mut(&request.parent_folder_id) {
                folder.file_names.retain(|n| n != &request.file_name);
            }
            return Err(e);
        }

        let file = StoredFile {
            id,
            file_name: request.file_name,
            file_path: request.file_path,
            parent_folder_id: Some(request.parent_folder_id),
            size_bytes: size as u64,
            created_at: Utc::now(),
        };
        self.storage
            .index
            .write()
            .await
            .files
            .insert(id, file.clone());

        tracing::info!(
            path = %path.display(),
            file_id = %id,
            file_name = %file.file_name,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(file)
    }
}

impl LocalUploads {
    async fn write_bytes(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        self.storage.ensure_parent_dir(path).await?;

        let mut file = fs::File::create(path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        Ok(())
    }
}

/// Remove whatever a failed write left at `path`.
async fn discard_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove partially written file"
            );
        }
    }
}

/// Hands every job its own uploads service bound to the job's requester.
#[derive(Clone)]
pub struct LocalScopeFactory {
    storage: LocalStorage,
}

impl LocalScopeFactory {
    pub fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }
}

impl ScopeFactory for LocalScopeFactory {
    fn create_scope(&self, identity: RequesterIdentity) -> JobScope {
        JobScope {
            files: Arc::new(self.storage.clone()),
            blobs: Arc::new(self.storage.clone()),
            uploads: Arc::new(self.storage.scoped(identity.clone())),
            identity,
        }
    }
}
