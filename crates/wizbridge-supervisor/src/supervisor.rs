//! Process supervisor (`spec.md` §4.7, §9: "deliberately lives outside
//! the bridge ... a crashed bridge should not be able to prevent its
//! own restart").

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::{Result, SupervisorError};
use crate::status::SupervisorStatus;

/// Backoff ceiling (`spec.md` §4.7).
const MAX_BACKOFF: Duration = Duration::from_secs(60);
/// A restart streak resets once this much quiet time has passed since
/// the last restart (`spec.md` §4.7).
const QUIET_RESET: Duration = Duration::from_secs(60);

struct Shared {
    status: Mutex<SupervisorStatus>,
    stop_requested: AtomicBool,
    stop_notify: Notify,
}

/// Supervises a child process, restarting it on exit with exponential
/// backoff capped at 60s, unless stopped explicitly.
pub struct Supervisor {
    program: String,
    args: Vec<String>,
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Supervisor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            shared: Arc::new(Shared {
                status: Mutex::new(SupervisorStatus::default()),
                stop_requested: AtomicBool::new(false),
                stop_notify: Notify::new(),
            }),
            task: Mutex::new(None),
        }
    }

    /// Spawn the supervise loop. Errors if already running.
    pub fn start(&self) -> Result<()> {
        let mut task = self.task.lock();
        if task.is_some() {
            return Err(SupervisorError::AlreadyRunning);
        }
        self.shared.stop_requested.store(false, Ordering::SeqCst);

        let program = self.program.clone();
        let args = self.args.clone();
        let shared = self.shared.clone();
        *task = Some(tokio::spawn(async move {
            supervise_loop(program, args, shared).await;
        }));
        Ok(())
    }

    /// Stop the supervisor: cancels any pending restart, kills the
    /// current child if one is running, and resets the restart streak
    /// (`spec.md` §4.7: "Explicit stop cancels pending restarts and
    /// resets n").
    pub async fn stop(&self) {
        self.shared.stop_requested.store(true, Ordering::SeqCst);
        self.shared.stop_notify.notify_waiters();

        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        let mut status = self.shared.status.lock();
        status.running = false;
        status.restart_count = 0;
        status.last_restart = None;
    }

    pub fn status(&self) -> SupervisorStatus {
        *self.shared.status.lock()
    }
}

async fn supervise_loop(program: String, args: Vec<String>, shared: Arc<Shared>) {
    let mut restarts: u32 = 0;
    let mut last_restart: Option<Instant> = None;

    loop {
        if shared.stop_requested.load(Ordering::SeqCst) {
            break;
        }

        let mut command = Command::new(&program);
        command.args(&args);
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!(error = %e, "failed to spawn child process");
                restarts += 1;
                shared.status.lock().restart_count = restarts;
                wait_backoff(restarts, &shared).await;
                continue;
            }
        };

        shared.status.lock().running = true;
        info!(program = %program, "child process started");

        tokio::select! {
            exit = child.wait() => {
                match exit {
                    Ok(status) => warn!(%status, "child process exited"),
                    Err(e) => warn!(error = %e, "failed to wait on child process"),
                }
            }
            _ = shared.stop_notify.notified() => {
                let _ = child.kill().await;
                shared.status.lock().running = false;
                break;
            }
        }

        if shared.stop_requested.load(Ordering::SeqCst) {
            shared.status.lock().running = false;
            break;
        }

        let now = Instant::now();
        if let Some(last) = last_restart {
            if now.duration_since(last) >= QUIET_RESET {
                restarts = 0;
            }
        }

        {
            let mut status = shared.status.lock();
            status.running = false;
            status.restart_count = restarts;
            status.last_restart = Some(now);
        }
        last_restart = Some(now);

        wait_backoff(restarts, &shared).await;
        restarts += 1;
    }
}

async fn wait_backoff(restarts: u32, shared: &Shared) {
    let delay = backoff_delay(restarts);
    info!(?delay, restarts, "restarting after backoff");
    tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = shared.stop_notify.notified() => {}
    }
}

/// `min(2^n * 1s, 60s)` (`spec.md` §4.7).
fn backoff_delay(restarts: u32) -> Duration {
    let secs = 2u64.saturating_pow(restarts.min(6));
    Duration::from_secs(secs).min(MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially_and_caps_at_sixty() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
        assert_eq!(backoff_delay(6), Duration::from_secs(60));
        assert_eq!(backoff_delay(10), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn restarts_a_crashing_child_and_reports_status() {
        let supervisor = Supervisor::new("sh", vec!["-c".into(), "exit 1".into()]);
        supervisor.start().unwrap();

        let mut saw_restart = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            if supervisor.status().restart_count >= 1 {
                saw_restart = true;
                break;
            }
        }
        assert!(saw_restart, "expected at least one restart to be recorded");

        supervisor.stop().await;
        assert_eq!(supervisor.status().restart_count, 0);
        assert!(!supervisor.status().running);
    }

    #[tokio::test]
    async fn stop_is_idempotent_when_never_started() {
        let supervisor = Supervisor::new("true", vec![]);
        supervisor.stop().await;
        assert!(!supervisor.status().running);
    }
}
