//! Discovery error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiscoveryError>;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("broadcast error: {0}")]
    Broadcast(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
