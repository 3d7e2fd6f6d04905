//! Supervisor status snapshot (`spec.md` §4.7: "start, stop, and
//! status (running flag, restart count, last-restart timestamp)").

use std::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct SupervisorStatus {
    pub running: bool,
    pub restart_count: u32,
    pub last_restart: Option<Instant>,
}

impl Default for SupervisorStatus {
    fn default() -> Self {
        Self {
            running: false,
            restart_count: 0,
            last_restart: None,
        }
    }
}
