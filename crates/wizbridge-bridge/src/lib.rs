//! The Art-Net to WiZ bulb bridge engine.
//!
//! Wires together the Art-Net decoder and WiZ codec from
//! `wizbridge_net` into the stateful pieces `spec.md` describes: a
//! per-bulb serial pump with change detection, coalescing, and
//! drop-oldest queueing (§4.2-§4.3), an off-transition verifier with
//! bounded retry (§4.5), and a polling config loader over a
//! `BulbStore` trait boundary (§4.8).

pub mod engine;
pub mod error;
pub mod pump;
pub mod state;
pub mod store;
pub mod verifier;

pub use engine::{Engine, RELOAD_INTERVAL, STATS_INTERVAL};
pub use error::{BridgeError, Result};
pub use pump::PumpHandle;
pub use store::{BulbStore, HttpBulbStore, StaticBulbStore, StoreError};
