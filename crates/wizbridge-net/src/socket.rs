//! Shared UDP socket for bulb control traffic
//!
//! One socket is used for both outbound `setPilot`/`getPilot` sends
//! and for receiving `getPilot` replies; the off-verifier needs to
//! dispatch those replies by source IP without stealing datagrams
//! meant for another bulb's verifier. `ControlSocket` runs a single
//! receiver task and fans incoming datagrams out to whichever
//! transient listener is currently registered for that source IP.

use bytes::Bytes;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{NetError, Result};

type Listeners = Arc<parking_lot::Mutex<HashMap<IpAddr, mpsc::Sender<Bytes>>>>;

/// A UDP socket shared between the pump's sender side and the
/// off-verifier's transient reply listeners.
pub struct ControlSocket {
    socket: Arc<UdpSocket>,
    listeners: Listeners,
}

impl ControlSocket {
    /// Bind and start the background receiver loop.
    pub async fn bind(addr: &str) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| NetError::Bind(e.to_string()))?;
        let socket = Arc::new(socket);
        let listeners: Listeners = Arc::new(parking_lot::Mutex::new(HashMap::new()));

        spawn_receiver(socket.clone(), listeners.clone());

        Ok(Self { socket, listeners })
    }

    /// Send a datagram to a bulb.
    pub async fn send_to(&self, data: &[u8], target: SocketAddr) -> Result<()> {
        self.socket
            .send_to(data, target)
            .await
            .map_err(|e| NetError::Send(e.to_string()))?;
        Ok(())
    }

    /// Register a transient listener for replies from `ip`. Only one
    /// listener per IP is honored at a time; registering a second one
    /// for the same IP replaces the first (this mirrors the spec's
    /// "at most one in-flight send/verify per bulb" invariant).
    pub fn listen(&self, ip: IpAddr) -> ReplyListener {
        let (tx, rx) = mpsc::channel(4);
        self.listeners.lock().insert(ip, tx);
        ReplyListener {
            ip,
            rx,
            listeners: self.listeners.clone(),
        }
    }
}

fn spawn_receiver(socket: Arc<UdpSocket>, listeners: Listeners) {
    tokio::spawn(async move {
        let mut buf = vec![0u8; 4096];
        loop {
            match socket.recv_from(&mut buf).await {
                Ok((len, from)) => {
                    let data = Bytes::copy_from_slice(&buf[..len]);
                    let sender = listeners.lock().get(&from.ip()).cloned();
                    if let Some(sender) = sender {
                        let _ = sender.try_send(data);
                    } else {
                        debug!("unsolicited reply from {from}, no listener registered");
                    }
                }
                Err(e) => {
                    warn!("control socket receive error: {e}");
                }
            }
        }
    });
}

/// A transient reply listener for one bulb's IP. Unregisters itself on
/// drop so a verifier that times out doesn't leak a stale entry.
pub struct ReplyListener {
    ip: IpAddr,
    rx: mpsc::Receiver<Bytes>,
    listeners: Listeners,
}

impl ReplyListener {
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }
}

impl Drop for ReplyListener {
    fn drop(&mut self) {
        self.listeners.lock().remove(&self.ip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn delivers_reply_to_registered_listener() {
        let server = ControlSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.socket.local_addr().unwrap();

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let client_addr = client.local_addr().unwrap();

        let mut listener = server.listen(client_addr.ip());
        client.send_to(b"hello", server_addr).await.unwrap();

        let data = tokio::time::timeout(Duration::from_secs(1), listener.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&data[..], b"hello");
    }

    #[tokio::test]
    async fn drops_datagrams_with_no_registered_listener() {
        let server = ControlSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.socket.local_addr().unwrap();

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(b"unsolicited", server_addr).await.unwrap();

        // No listener registered; give the receiver task a moment to
        // process, then confirm a freshly registered listener for the
        // same IP doesn't see the stale datagram.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let mut listener = server.listen(client.local_addr().unwrap().ip());
        let result = tokio::time::timeout(Duration::from_millis(100), listener.recv()).await;
        assert!(result.is_err());
    }
}
