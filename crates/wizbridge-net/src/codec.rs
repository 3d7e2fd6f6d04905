//! WiZ bulb control protocol: JSON-over-UDP `setPilot` / `getPilot`.
//!
//! Requests and replies are single JSON objects, one per UDP datagram,
//! with no additional framing.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use wizbridge_core::SlotVector;

/// Standard WiZ bulb control port.
pub const BULB_PORT: u16 = 38899;

#[derive(Debug, Clone, Serialize)]
struct SetPilotParams {
    r: u8,
    g: u8,
    b: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    c: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    w: Option<u8>,
    dimming: u8,
    state: bool,
}

#[derive(Debug, Clone, Serialize)]
struct SetPilotRequest {
    id: u32,
    method: &'static str,
    params: SetPilotParams,
}

/// Encode a `setPilot` request for the given slot vector, or `None` if
/// the suppression rule applies.
///
/// Suppression: a vector with `state == false` and `state_changed ==
/// false` neither transmits nor verifies (`spec.md` §3 invariant 5,
/// §4.4). `id` is always `1`; no reply is correlated against it
/// (`spec.md` §9).
pub fn encode_set_pilot(vector: &SlotVector, state_changed: bool) -> Option<Vec<u8>> {
    if !vector.state && !state_changed {
        return None;
    }

    let request = SetPilotRequest {
        id: 1,
        method: "setPilot",
        params: SetPilotParams {
            r: vector.r,
            g: vector.g,
            b: vector.b,
            c: (vector.c > 0).then_some(vector.c),
            w: (vector.w > 0).then_some(vector.w),
            dimming: vector.dimming,
            state: vector.state,
        },
    };

    serde_json::to_vec(&request).ok()
}

#[derive(Debug, Clone, Serialize)]
struct GetPilotRequest {
    method: &'static str,
    params: EmptyParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmptyParams {}

/// Encode a `getPilot` request.
pub fn encode_get_pilot() -> Vec<u8> {
    serde_json::to_vec(&GetPilotRequest {
        method: "getPilot",
        params: EmptyParams {},
    })
    .expect("getPilot request always serializes")
}

/// The `result` object of a `getPilot` reply.
///
/// Unknown fields (`rssi`, `temp`, `sceneId`, ...) are preserved in
/// `raw` for callers (discovery) that want to report them verbatim
/// without this crate modeling every WiZ firmware variant.
#[derive(Debug, Clone, Deserialize)]
pub struct GetPilotResult {
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub state: bool,
    #[serde(default)]
    pub dimming: Option<u8>,
    #[serde(default)]
    pub rssi: Option<i32>,
    #[serde(flatten)]
    pub raw: Value,
}

#[derive(Debug, Clone, Deserialize)]
struct GetPilotReply {
    #[allow(dead_code)]
    method: Option<String>,
    result: GetPilotResult,
}

/// Parse a datagram as a `getPilot` reply (`{"method":"getPilot","result":{...}}`).
/// Returns `None` for anything else, including malformed JSON.
pub fn parse_get_pilot_reply(buf: &[u8]) -> Option<GetPilotResult> {
    let reply: GetPilotReply = serde_json::from_slice(buf).ok()?;
    Some(reply.result)
}
