//! Bridge-engine error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("socket bind failed: {0}")]
    Bind(String),

    #[error("bulb store error: {0}")]
    Store(String),

    #[error("net error: {0}")]
    Net(#[from] wizbridge_net::NetError),

    #[error("core error: {0}")]
    Core(#[from] wizbridge_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
