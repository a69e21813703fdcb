//! # vigil-process
//!
//! Child-process lifecycle: the [`Builder`] contract with its command-running
//! implementation, workspace manifest entry-point detection, and the
//! [`ProcessSupervisor`] that owns at most one managed process and terminates
//! whole process trees through platform-selected [`Termination`] strategies.

pub mod builder;
pub mod error;
pub mod kill;
pub mod manifest;
pub mod supervisor;

pub use builder::{Builder, CommandBuilder};
pub use error::{BuildError, SuperviseError};
pub use kill::{platform_termination, Termination};
pub use supervisor::{ManagedProcess, ManagedStatus, ProcessSupervisor};
