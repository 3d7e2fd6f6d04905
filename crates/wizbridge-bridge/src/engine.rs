//! The bridge engine: Art-Net ingestion, bulb-list reload, and the
//! stats tick, wired together (`spec.md` §2, §5; SPEC_FULL §4.8/§4.9).
//!
//! The bulb-list snapshot is an `ArcSwap<HashMap<BulbId, Entry>>`
//! (SPEC_FULL §5): the Art-Net receive loop reads it on every frame,
//! the reload loop is the only writer, and a reload replaces the whole
//! map atomically so in-flight pumps for MACs that persist across a
//! reload are untouched.

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};
use wizbridge_core::{BulbId, SlotVector};
use wizbridge_net::{accepts_universe, decode_art_dmx, ControlSocket, ARTNET_PORT, BULB_PORT};

use crate::error::{BridgeError, Result};
use crate::pump::{self, PumpHandle};
use crate::store::BulbStore;

/// Config-reload interval (`spec.md` §5, §6).
pub const RELOAD_INTERVAL: Duration = Duration::from_secs(60);

/// Stats-tick interval (SPEC_FULL §4.9).
pub const STATS_INTERVAL: Duration = Duration::from_secs(30);

struct Entry {
    channel: u16,
    pump: PumpHandle,
}

/// Long-lived bridge engine: one Art-Net socket, one bulb control
/// socket, a reload loop, a stats-tick loop, and one pump per
/// configured bulb.
pub struct Engine {
    store: Arc<dyn BulbStore>,
    control: Arc<ControlSocket>,
    bulbs: ArcSwap<HashMap<BulbId, Entry>>,
    artnet_bind: String,
}

impl Engine {
    /// Bind the Art-Net and bulb-control sockets and load the initial
    /// bulb list. Bind failures are fatal at startup (`spec.md` §7):
    /// the caller (the CLI binary) should let this propagate out of
    /// `main` so the supervisor restarts the process.
    pub async fn bind(store: Arc<dyn BulbStore>, artnet_bind: impl Into<String>) -> Result<Self> {
        let artnet_bind = artnet_bind.into();
        let control = ControlSocket::bind(&format!("0.0.0.0:{BULB_PORT}"))
            .await
            .map_err(BridgeError::from)?;

        let engine = Self {
            store,
            control: Arc::new(control),
            bulbs: ArcSwap::from_pointee(HashMap::new()),
            artnet_bind,
        };

        engine.reload_once().await;
        Ok(engine)
    }

    /// Convenience constructor binding Art-Net on its standard port
    /// (`wizbridge_net::ARTNET_PORT`, 6454) on all interfaces.
    pub async fn bind_default(store: Arc<dyn BulbStore>) -> Result<Self> {
        Self::bind(store, format!("0.0.0.0:{ARTNET_PORT}")).await
    }

    /// Run forever: the Art-Net receive loop plus the reload and stats
    /// background ticks. Returns only on a fatal socket error.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let socket = UdpSocket::bind(&self.artnet_bind)
            .await
            .map_err(|e| BridgeError::Bind(e.to_string()))?;
        info!(addr = %self.artnet_bind, "art-net socket bound");

        let reload_engine = self.clone();
        tokio::spawn(async move { reload_engine.reload_loop().await });

        let stats_engine = self.clone();
        tokio::spawn(async move { stats_engine.stats_loop().await });

        self.recv_loop(socket).await
    }

    async fn recv_loop(&self, socket: UdpSocket) -> Result<()> {
        let mut buf = vec![0u8; 2048];
        loop {
            let (len, _from) = socket.recv_from(&mut buf).await?;
            let Some(packet) = decode_art_dmx(&buf[..len]) else {
                continue;
            };
            if !accepts_universe(packet.universe) {
                continue;
            }

            let bulbs = self.bulbs.load();
            for entry in bulbs.values() {
                let vector = SlotVector::extract(&packet.data, entry.channel);
                entry.pump.on_dmx_frame(vector);
            }
        }
    }

    async fn reload_loop(&self) {
        let mut ticker = tokio::time::interval(RELOAD_INTERVAL);
        ticker.tick().await; // initial load already happened in `bind`
        loop {
            ticker.tick().await;
            self.reload_once().await;
        }
    }

    async fn reload_once(&self) {
        let records = match self.store.read_all().await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "bulb store reload failed, retaining previous snapshot");
                return;
            }
        };

        let previous = self.bulbs.load();
        let mut next = HashMap::with_capacity(records.len());

        for record in records {
            if let Some(existing) = previous.get(&record.mac) {
                next.insert(
                    record.mac,
                    Entry {
                        channel: record.channel,
                        pump: existing.pump.clone(),
                    },
                );
            } else {
                let pump = pump::spawn(
                    record.mac.clone(),
                    record.ip,
                    BULB_PORT,
                    self.control.clone(),
                );
                next.insert(
                    record.mac,
                    Entry {
                        channel: record.channel,
                        pump,
                    },
                );
            }
        }

        for (mac, entry) in previous.iter() {
            if !next.contains_key(mac) {
                debug!(%mac, "bulb removed from config, closing pump");
                entry.pump.close();
            }
        }

        info!(count = next.len(), "bulb config reloaded");
        self.bulbs.store(Arc::new(next));
    }

    async fn stats_loop(&self) {
        let mut ticker = tokio::time::interval(STATS_INTERVAL);
        loop {
            ticker.tick().await;
            let bulbs = self.bulbs.load();
            for (mac, entry) in bulbs.iter() {
                let (queued, sent, dropped) = entry.pump.stats();
                info!(
                    %mac,
                    queued,
                    sent,
                    dropped,
                    queue_len = entry.pump.queue_len(),
                    "bulb stats"
                );
            }
        }
    }
}
