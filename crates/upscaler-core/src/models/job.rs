use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

use super::RequesterIdentity;

/// Identifier handed back for every accepted upscale request
pub type JobId = Uuid;

/// A request to upscale one stored file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpscaleRequest {
    pub file_id: Uuid,
    pub requester: RequesterIdentity,
}

/// Output of the remote model, ready to be written back to storage
#[derive(Clone, PartialEq, Eq)]
pub struct UpscaleResult {
    pub bytes: Vec<u8>,
    pub suggested_file_name: String,
}

impl std::fmt::Debug for UpscaleResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("UpscaleResult")
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("suggested_file_name", &self.suggested_file_name)
            .finish()
    }
}

/// Lifecycle of a submitted upscale job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for the memory gate to admit the job
    WaitingForCapacity,
    Running,
    Completed {
        file_id: Uuid,
        file_name: String,
    },
    Failed {
        error_code: String,
        message: String,
    },
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Completed { .. } | JobStatus::Failed { .. })
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            JobStatus::WaitingForCapacity => write!(f, "waiting_for_capacity"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed { .. } => write!(f, "completed"),
            JobStatus::Failed { .. } => write!(f, "failed"),
        }
    }
}
