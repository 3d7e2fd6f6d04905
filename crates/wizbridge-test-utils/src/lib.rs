//! Shared test helpers for the wizbridge workspace.
//!
//! Condition-based waiting (no hardcoded sleeps where avoidable), UDP
//! port allocation, and a fake WiZ bulb UDP responder used across the
//! net/bridge/discovery crates' integration tests.

use serde_json::Value;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

/// Default condition-check interval for [`wait_for`].
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(10);

/// Find an available UDP port by binding ephemeral port 0 and reading
/// it back.
pub async fn find_available_udp_port() -> u16 {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    socket.local_addr().unwrap().port()
}

/// Poll `check` every `interval` until it returns `true` or `max_wait`
/// elapses. Returns whether the condition was observed.
pub async fn wait_for<F, Fut>(check: F, interval: Duration, max_wait: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = Instant::now();
    loop {
        if check().await {
            return true;
        }
        if start.elapsed() >= max_wait {
            return false;
        }
        tokio::time::sleep(interval).await;
    }
}

/// Wait for an atomic counter to reach at least `target`.
pub async fn wait_for_count(counter: &AtomicU32, target: u32, max_wait: Duration) -> bool {
    wait_for(
        || async { counter.load(Ordering::SeqCst) >= target },
        DEFAULT_CHECK_INTERVAL,
        max_wait,
    )
    .await
}

/// A WiZ bulb stand-in that answers `getPilot` with its current
/// recorded state and records every datagram it receives, for tests
/// that need to assert on outbound `setPilot` traffic or exercise the
/// off-verifier without a real bulb on the network.
pub struct FakeBulb {
    addr: SocketAddr,
    requests: Arc<AsyncMutex<Vec<Value>>>,
    request_count: Arc<AtomicU32>,
    state: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl FakeBulb {
    /// Start a fake bulb reporting `initial_state` to `getPilot`
    /// polls. Every incoming `setPilot` updates the recorded state to
    /// match, mirroring a real bulb's behavior.
    pub async fn start(initial_state: bool) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let requests = Arc::new(AsyncMutex::new(Vec::new()));
        let request_count = Arc::new(AtomicU32::new(0));
        let state = Arc::new(AtomicBool::new(initial_state));

        let task_requests = requests.clone();
        let task_count = request_count.clone();
        let task_state = state.clone();
        let handle = tokio::spawn(async move {
            let mut buf = vec![0u8; 2048];
            loop {
                let Ok((len, from)) = socket.recv_from(&mut buf).await else {
                    break;
                };
                let Ok(parsed) = serde_json::from_slice::<Value>(&buf[..len]) else {
                    continue;
                };

                match parsed["method"].as_str() {
                    Some("setPilot") => {
                        if let Some(new_state) = parsed["params"]["state"].as_bool() {
                            task_state.store(new_state, Ordering::SeqCst);
                        }
                    }
                    Some("getPilot") => {
                        let reply = serde_json::json!({
                            "method": "getPilot",
                            "result": { "state": task_state.load(Ordering::SeqCst) },
                        });
                        let bytes = serde_json::to_vec(&reply).unwrap();
                        let _ = socket.send_to(&bytes, from).await;
                    }
                    _ => {}
                }

                task_requests.lock().await.push(parsed);
                task_count.fetch_add(1, Ordering::SeqCst);
            }
        });

        Self {
            addr,
            requests,
            request_count,
            state,
            handle,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Force the bulb's reported state regardless of the last
    /// `setPilot` it saw — useful for simulating a bulb that refuses
    /// to apply an off command (verification-failure scenarios).
    pub fn force_state(&self, state: bool) {
        self.state.store(state, Ordering::SeqCst);
    }

    pub async fn requests(&self) -> Vec<Value> {
        self.requests.lock().await.clone()
    }

    pub async fn wait_for_request_count(&self, n: u32, max_wait: Duration) -> bool {
        wait_for_count(&self.request_count, n, max_wait).await
    }
}

impl Drop for FakeBulb {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wizbridge_net::{encode_get_pilot, encode_set_pilot};

    #[tokio::test]
    async fn find_available_udp_port_is_bindable() {
        let port = find_available_udp_port().await;
        assert!(port > 0);
    }

    #[tokio::test]
    async fn fake_bulb_tracks_set_pilot_state() {
        let bulb = FakeBulb::start(false).await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let vector = wizbridge_core::SlotVector {
            r: 255,
            g: 0,
            b: 0,
            c: 0,
            w: 0,
            dimming: 100,
            state: true,
        };
        let on = encode_set_pilot(&vector, true).unwrap();
        client.send_to(&on, bulb.addr()).await.unwrap();
        assert!(bulb.wait_for_request_count(1, Duration::from_secs(1)).await);

        let poll = encode_get_pilot();
        client.send_to(&poll, bulb.addr()).await.unwrap();

        let mut buf = vec![0u8; 1024];
        let (len, _) = client.recv_from(&mut buf).await.unwrap();
        let reply: Value = serde_json::from_slice(&buf[..len]).unwrap();
        assert_eq!(reply["result"]["state"], true);
    }
}
