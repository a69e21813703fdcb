//! # vigil-source
//!
//! Remote snapshot access: the [`SourceProvider`] contract and its GitHub
//! implementation.
//!
//! A provider is bound to one `{owner, repo, branch}` reference at
//! construction; [`SourceProvider::resolve_commit`] answers "what commit is
//! the reference at now" and [`SourceProvider::list_files`] materializes the
//! full blob set of that reference. Both are idempotent and side-effect-free.

pub mod error;
pub mod github;
pub mod provider;

pub use error::FetchError;
pub use github::GitHubProvider;
pub use provider::SourceProvider;
