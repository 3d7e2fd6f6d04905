//! Process supervisor for the wizbridge bridge engine.
//!
//! Deliberately a separate unit from the bridge itself (`spec.md` §9):
//! it owns only the child-process handle and backoff counters, so a
//! crashed bridge can never prevent its own restart.

pub mod error;
pub mod status;
pub mod supervisor;

pub use error::{Result, SupervisorError};
pub use status::SupervisorStatus;
pub use supervisor::Supervisor;
