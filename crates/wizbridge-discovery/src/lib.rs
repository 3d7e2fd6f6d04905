//! WiZ bulb discovery
//!
//! Broadcasts a `getPilot` request and aggregates unique responders
//! over a fixed time window.

pub mod discovered;
pub mod error;
pub mod scan;

pub use discovered::DiscoveredBulb;
pub use error::{DiscoveryError, Result};
pub use scan::{discover, DEFAULT_TIMEOUT};
