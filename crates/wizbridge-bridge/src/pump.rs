//! Per-bulb serial pump: single-consumer drain of one bulb's queue.
//!
//! Each bulb gets its own `Pump`, grounded in `spec.md` §4.3/§9
//! ("single-ownership pumps over shared locks"). `last_received` and
//! the bounded queue are touched by both the decoder (via
//! [`PumpHandle::on_dmx_frame`]) and this task, so they live behind a
//! short `parking_lot::Mutex` (mirroring `wizbridge_net::ControlSocket`'s
//! listener map). `last_sent` is touched only from inside [`run`], so
//! it is a plain local variable — no lock needed for it at all.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};
use wizbridge_core::{BulbId, SlotVector};
use wizbridge_net::{encode_set_pilot, ControlSocket};

use crate::state::{QueueEntry, SharedState, Stats, MAX_VERIFY_RETRIES};
use crate::verifier::verify_off;

struct Inner {
    shared: Mutex<SharedState>,
    stats: Stats,
    notify: Notify,
    stopped: AtomicBool,
}

/// A handle to a running pump. Cheap to clone; the decoder holds one
/// per bulb in its current snapshot.
#[derive(Clone)]
pub struct PumpHandle {
    inner: Arc<Inner>,
}

impl PumpHandle {
    /// Feed a freshly decoded slot vector from the Art-Net path.
    ///
    /// Performs change detection against `lastReceived` and, on
    /// change, updates it and enqueues (`spec.md` §4.2). A no-op
    /// vector is silently dropped, never touching the queue or stats.
    pub fn on_dmx_frame(&self, vector: SlotVector) {
        let mut shared = self.inner.shared.lock();
        if shared.last_received == vector {
            return;
        }
        shared.last_received = vector;
        let evicted = shared.push(QueueEntry {
            vector,
            retry_count: 0,
        });
        drop(shared);

        self.inner.stats.record_queued();
        if evicted {
            self.inner.stats.record_dropped();
        }
        self.inner.notify.notify_one();
    }

    /// Re-enqueue a vector after a failed off-verification, with its
    /// retry count incremented. Goes through the same bounded
    /// enqueue/drop-oldest path as a fresh DMX-derived vector.
    fn retry_enqueue(&self, vector: SlotVector, retry_count: u8) {
        let evicted = {
            let mut shared = self.inner.shared.lock();
            shared.push(QueueEntry {
                vector,
                retry_count,
            })
        };
        self.inner.stats.record_queued();
        if evicted {
            self.inner.stats.record_dropped();
        }
        self.inner.notify.notify_one();
    }

    pub fn stats(&self) -> (u32, u32, u32) {
        self.inner.stats.snapshot()
    }

    pub fn queue_len(&self) -> usize {
        self.inner.shared.lock().queue.len()
    }

    /// Tell the pump to stop consuming new work once its queue
    /// drains. In-flight sends/verifies already underway are allowed
    /// to finish (`spec.md` §9: "populated ... for newly-seen MACs and
    /// retained across reloads for existing MACs").
    pub fn close(&self) {
        self.inner.stopped.store(true, Ordering::Relaxed);
        self.inner.notify.notify_one();
    }
}

/// Spawn a pump task for `mac`/`ip` and return a handle to it.
pub fn spawn(mac: BulbId, ip: IpAddr, bulb_port: u16, control: Arc<ControlSocket>) -> PumpHandle {
    let inner = Arc::new(Inner {
        shared: Mutex::new(SharedState::default()),
        stats: Stats::default(),
        notify: Notify::new(),
        stopped: AtomicBool::new(false),
    });
    let handle = PumpHandle {
        inner: inner.clone(),
    };
    let task_handle = handle.clone();

    info!(%mac, %ip, "pump started");
    tokio::spawn(async move {
        run(mac, SocketAddr::new(ip, bulb_port), control, inner, task_handle).await;
    });

    handle
}

async fn run(
    mac: BulbId,
    bulb_addr: SocketAddr,
    control: Arc<ControlSocket>,
    inner: Arc<Inner>,
    handle: PumpHandle,
) {
    let mut last_sent = SlotVector::default();

    loop {
        inner.notify.notified().await;
        drain(&mac, bulb_addr, &control, &inner, &handle, &mut last_sent).await;
        if inner.stopped.load(Ordering::Relaxed) {
            debug!(%mac, "pump stopping, queue drained");
            return;
        }
    }
}

/// Drain the queue to empty, coalescing/suppressing/sending/verifying
/// per `spec.md` §4.3-§4.5. A coalesced-drop (dequeued vector equals
/// `last_sent`) re-enters the loop immediately rather than stalling
/// (`spec.md` §9's documented fix for the source's "processQueue
/// deadlock" bug).
async fn drain(
    mac: &BulbId,
    bulb_addr: SocketAddr,
    control: &ControlSocket,
    inner: &Inner,
    handle: &PumpHandle,
    last_sent: &mut SlotVector,
) {
    loop {
        let entry = {
            let mut shared = inner.shared.lock();
            shared.queue.pop_front()
        };
        let Some(entry) = entry else { return };

        if entry.vector == *last_sent {
            continue;
        }

        let state_changed = entry.vector.state != last_sent.state;

        let Some(payload) = encode_set_pilot(&entry.vector, state_changed) else {
            // Suppressed steady-state-off vector: neither transmits
            // nor verifies, and last_sent is unaffected.
            continue;
        };

        if let Err(e) = control.send_to(&payload, bulb_addr).await {
            warn!(%mac, error = %e, "setPilot send failed");
            // Treated as completed so the queue keeps draining
            // (`spec.md` §7: transient send failure).
        }
        inner.stats.record_sent();

        let is_off_transition = state_changed && !entry.vector.state;
        if !is_off_transition {
            *last_sent = entry.vector;
            continue;
        }

        if verify_off(control, bulb_addr.ip(), bulb_addr.port()).await {
            *last_sent = entry.vector;
            continue;
        }

        if entry.retry_count < MAX_VERIFY_RETRIES {
            debug!(%mac, retry = entry.retry_count + 1, "off-verification failed, retrying");
            handle.retry_enqueue(entry.vector, entry.retry_count + 1);
        } else {
            error!(%mac, "off-verification failed after {} retries, giving up", MAX_VERIFY_RETRIES);
            *last_sent = entry.vector;
        }
    }
}
