//! Shared error type for the wizbridge workspace

use thiserror::Error;

/// Result type alias used across wizbridge crates
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A MAC address from the bulb store did not parse as six hex octets
    #[error("invalid mac address: {0}")]
    InvalidMac(String),

    /// DMX channel outside the 1..=512 range
    #[error("channel {0} out of range (1..=512)")]
    ChannelOutOfRange(u16),

    /// Underlying I/O failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Bulb record store is unreachable or returned malformed data
    #[error("bulb store error: {0}")]
    Store(String),
}
