//! Supervisor daemon runtime: poller + update-cycle controller.

pub mod cycle;
mod error;
pub mod poller;
mod runtime;

pub use cycle::{CycleController, CycleOutcome, CyclePhase, CycleReport, TERMINATE_GRACE};
pub use error::DaemonError;
pub use poller::{Poller, TickOutcome};
pub use runtime::{run, start_blocking};
