//! Per-job collaborator scope
//!
//! A detached job must not share per-request state (the identity in particular)
//! with other jobs running concurrently. Each job asks a [`ScopeFactory`] for
//! its own [`JobScope`] when it starts and drops it when it finishes.

use std::sync::Arc;

use upscaler_core::models::RequesterIdentity;

use crate::traits::{BlobStore, FileUploads, FilesRepository};

/// Collaborators available to one job invocation.
///
/// The uploads service is bound to `identity`: files it writes land in that
/// requester's physical storage.
#[derive(Clone)]
pub struct JobScope {
    pub identity: RequesterIdentity,
    pub files: Arc<dyn FilesRepository>,
    pub uploads: Arc<dyn FileUploads>,
    pub blobs: Arc<dyn BlobStore>,
}

/// Builds a fresh [`JobScope`] for a given requester.
pub trait ScopeFactory: Send + Sync {
    fn create_scope(&self, identity: RequesterIdentity) -> JobScope;
}
