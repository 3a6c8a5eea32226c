pub mod file;
pub mod identity;
pub mod job;

pub use file::{FileAddRequest, Folder, StoredFile};
pub use identity::RequesterIdentity;
pub use job::{JobId, JobStatus, UpscaleRequest, UpscaleResult};
