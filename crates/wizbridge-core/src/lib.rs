//! Core data model for the wizbridge Art-Net to WiZ bulb bridge
//!
//! This crate has no I/O. It defines the bulb record shape consumed from
//! the external store, the DMX-derived slot vector, and the shared error
//! type used across the net/bridge/discovery/supervisor crates.

pub mod bulb;
pub mod error;
pub mod slots;

pub use bulb::{BulbId, BulbRecord};
pub use error::{Error, Result};
pub use slots::SlotVector;
