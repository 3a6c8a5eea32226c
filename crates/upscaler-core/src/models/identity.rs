use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Identity of the user who requested an operation.
///
/// Background jobs run outside the request that created them, so they carry an
/// owned copy of this value rather than reading any ambient session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequesterIdentity {
    pub user_id: Uuid,
    /// Root directory holding this user's file bytes, one file per id
    pub physical_storage_path: PathBuf,
}

impl RequesterIdentity {
    pub fn new(user_id: Uuid, physical_storage_path: impl Into<PathBuf>) -> Self {
        Self {
            user_id,
            physical_storage_path: physical_storage_path.into(),
        }
    }

    /// Physical location of the bytes of the given file.
    pub fn physical_path_for(&self, file_id: Uuid) -> PathBuf {
        self.physical_storage_path.join(file_id.to_string())
    }
}
