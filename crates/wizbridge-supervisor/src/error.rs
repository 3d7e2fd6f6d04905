//! Supervisor error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SupervisorError>;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("failed to spawn child process: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("supervisor already running")]
    AlreadyRunning,
}
