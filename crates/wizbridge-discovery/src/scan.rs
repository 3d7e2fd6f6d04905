//! UDP broadcast discovery of WiZ bulbs
//!
//! Binds an ephemeral socket, broadcasts a `getPilot` request to
//! `255.255.255.255:38899`, and collects replies for a fixed window.
//! Each responding MAC is reported once even if it replies more than
//! once within the window.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, info};
use wizbridge_net::{encode_get_pilot, parse_get_pilot_reply, BULB_PORT};

use crate::discovered::DiscoveredBulb;
use crate::error::{DiscoveryError, Result};

/// Default discovery window (`spec.md` §4.6, §6).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Broadcast `getPilot` and collect unique responders for `timeout`.
pub async fn discover(timeout: Duration) -> Result<Vec<DiscoveredBulb>> {
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(DiscoveryError::Io)?;
    socket.set_broadcast(true).map_err(DiscoveryError::Io)?;

    let broadcast_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), BULB_PORT);
    let request = encode_get_pilot();
    socket
        .send_to(&request, broadcast_addr)
        .await
        .map_err(|e| DiscoveryError::Broadcast(e.to_string()))?;

    info!("broadcast getPilot discovery, window={:?}", timeout);

    collect_replies(&socket, timeout).await
}

/// Read from `socket` until `window` elapses, deduping responders by
/// MAC. Split out from `discover` so the dedup/parsing logic can be
/// exercised directly against a loopback socket in tests, which can't
/// rely on broadcast delivery in a sandboxed runner.
async fn collect_replies(socket: &UdpSocket, window: Duration) -> Result<Vec<DiscoveredBulb>> {
    let mut found: HashMap<String, DiscoveredBulb> = HashMap::new();
    let deadline = Instant::now() + window;
    let mut buf = vec![0u8; 4096];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        let recv = tokio::time::timeout(remaining, socket.recv_from(&mut buf)).await;
        let (len, from) = match recv {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                debug!("discovery recv error: {e}");
                continue;
            }
            Err(_) => break, // deadline elapsed
        };

        let Some(result) = parse_get_pilot_reply(&buf[..len]) else {
            debug!("ignoring malformed discovery reply from {from}");
            continue;
        };

        let Some(mac) = result.mac.clone() else {
            debug!("ignoring discovery reply with no mac from {from}");
            continue;
        };

        let ip = match from.ip() {
            IpAddr::V4(v4) => v4,
            IpAddr::V6(_) => continue,
        };

        found.entry(mac.clone()).or_insert(DiscoveredBulb {
            mac,
            ip,
            state: result.state,
            rssi: result.rssi,
            dimming: result.dimming,
            raw: result.raw,
        });
    }

    Ok(found.into_values().collect())
}
