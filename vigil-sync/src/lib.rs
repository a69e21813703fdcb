//! # vigil-sync
//!
//! Workspace replacement synchronizer.
//!
//! Call [`sync`] to reconcile a local workspace root against a remote
//! snapshot: stale entries are deleted (protected paths excepted), then every
//! snapshot file is written with an atomic tmp-and-rename. Full replacement,
//! no diffing — a partial tree from a failed prior build must never linger.

pub mod error;
pub mod workspace;

pub use error::SyncError;
pub use workspace::{sync, SyncReport};
