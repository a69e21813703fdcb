//! The `SourceProvider` contract.

use async_trait::async_trait;

use vigil_core::types::{CommitId, FileEntry};

use crate::error::FetchError;

/// Read-only access to one remote reference.
///
/// Implementations are bound to a single `{owner, repo, branch}` at
/// construction. Calls must be idempotent and side-effect-free so the poll
/// loop can repeat them every tick.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Resolve the reference to its current commit identifier.
    async fn resolve_commit(&self) -> Result<CommitId, FetchError>;

    /// Return every blob reachable from the reference, with content.
    async fn list_files(&self) -> Result<Vec<FileEntry>, FetchError>;
}
