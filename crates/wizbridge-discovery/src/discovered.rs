//! Representation of a bulb found during a discovery scan

use serde::Serialize;
use serde_json::Value;
use std::net::Ipv4Addr;

/// One bulb that answered a `getPilot` broadcast.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredBulb {
    pub mac: String,
    pub ip: Ipv4Addr,
    pub state: bool,
    pub rssi: Option<i32>,
    pub dimming: Option<u8>,
    /// The full `getPilot` result object, for callers that want fields
    /// this crate doesn't model explicitly.
    pub raw: Value,
}
