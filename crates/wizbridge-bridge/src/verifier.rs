//! Off-transition verifier (`spec.md` §4.5).
//!
//! Triggered only after a state→off `setPilot` has just been
//! transmitted: sleeps 200ms, polls `getPilot`, and waits up to
//! 1000ms for a reply from exactly that bulb's IP confirming
//! `result.state == false`.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use wizbridge_net::{encode_get_pilot, parse_get_pilot_reply, ControlSocket};

const SETTLE_DELAY: Duration = Duration::from_millis(200);
const REPLY_TIMEOUT: Duration = Duration::from_millis(1000);

/// Poll `bulb_ip` and report whether it confirms `state == false`.
///
/// Any failure to parse a reply, or silence past the timeout, counts
/// as a verification failure (`spec.md` §7: "Verification timeout ...
/// treated identically to verification failure").
pub async fn verify_off(socket: &ControlSocket, bulb_ip: IpAddr, bulb_port: u16) -> bool {
    tokio::time::sleep(SETTLE_DELAY).await;

    let mut listener = socket.listen(bulb_ip);
    let request = encode_get_pilot();
    if socket
        .send_to(&request, SocketAddr::new(bulb_ip, bulb_port))
        .await
        .is_err()
    {
        return false;
    }

    let deadline = tokio::time::Instant::now() + REPLY_TIMEOUT;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            return false;
        }
        let Ok(Some(datagram)) = tokio::time::timeout(remaining, listener.recv()).await else {
            return false;
        };
        if let Some(result) = parse_get_pilot_reply(&datagram) {
            return !result.state;
        }
        // Not a getPilot reply (or malformed); keep waiting for the
        // real one within the remaining window.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::UdpSocket;

    #[tokio::test]
    async fn succeeds_when_bulb_reports_off() {
        let server = ControlSocket::bind("127.0.0.1:0").await.unwrap();

        let bulb = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let bulb_addr = bulb.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1024];
            let (_, from) = bulb.recv_from(&mut buf).await.unwrap();
            let body = br#"{"method":"getPilot","result":{"mac":"x","state":false}}"#;
            bulb.send_to(body, from).await.unwrap();
        });

        let ok = verify_off(&server, bulb_addr.ip(), bulb_addr.port()).await;
        assert!(ok);
    }

    #[tokio::test]
    async fn fails_when_bulb_reports_on() {
        let server = ControlSocket::bind("127.0.0.1:0").await.unwrap();

        let bulb = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let bulb_addr = bulb.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1024];
            let (_, from) = bulb.recv_from(&mut buf).await.unwrap();
            let body = br#"{"method":"getPilot","result":{"mac":"x","state":true}}"#;
            bulb.send_to(body, from).await.unwrap();
        });

        let ok = verify_off(&server, bulb_addr.ip(), bulb_addr.port()).await;
        assert!(!ok);
    }

    #[tokio::test]
    async fn fails_on_timeout_with_no_reply() {
        let server = ControlSocket::bind("127.0.0.1:0").await.unwrap();
        // Nothing listening on this address; the send succeeds (UDP is
        // fire-and-forget) but no reply ever arrives.
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let silent_addr = silent.local_addr().unwrap();
        drop(silent);

        let ok = verify_off(&server, silent_addr.ip(), silent_addr.port()).await;
        assert!(!ok);
    }
}
