//! Vigil core library — domain types, configuration, errors.
//!
//! Public API surface:
//! - [`types`] — newtypes and domain structs shared by every crate
//! - [`error`] — [`ConfigError`]
//! - [`config`] — load / save / defaults

pub mod config;
pub mod error;
pub mod types;

pub use config::SupervisorConfig;
pub use error::ConfigError;
pub use types::{CommitId, EntryPoint, FileEntry};
