//! Net-layer error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, NetError>;

#[derive(Error, Debug)]
pub enum NetError {
    #[error("bind failed: {0}")]
    Bind(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
