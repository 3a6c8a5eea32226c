use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored file as seen by the upscale pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: Uuid,
    pub file_name: String,
    /// Logical path inside the user's folder hierarchy (e.g. `/photos/photo.png`)
    pub file_path: String,
    pub parent_folder_id: Option<Uuid>,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// Folder with the names of the files it currently contains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: Uuid,
    pub folder_path: String,
    pub file_names: Vec<String>,
}

impl Folder {
    /// Logical path of a child file with the given name.
    pub fn child_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.folder_path.trim_end_matches('/'), file_name)
    }
}

/// Request to create a new file through the upload contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAddRequest {
    pub file_name: String,
    pub file_path: String,
    pub parent_folder_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_path() {
        let folder = Folder {
            id: Uuid::new_v4(),
            folder_path: "/photos/".to_string(),
            file_names: vec![],
        };
        assert_eq!(folder.child_path("UHQ a.png"), "/photos/UHQ a.png");

        let root = Folder {
            folder_path: "/".to_string(),
            ..folder
        };
        assert_eq!(root.child_path("a.png"), "/a.png");
    }
}
