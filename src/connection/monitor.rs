//! Liveness monitor: pings the pool and turns outcome changes into connection events.

use sqlx::PgPool;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected,
    Error(String),
    Disconnected,
    Reconnected,
}

impl ConnectionEvent {
    pub fn log(&self) {
        match self {
            ConnectionEvent::Connected => tracing::info!(event = "connected", "database connected"),
            ConnectionEvent::Error(e) => tracing::error!(event = "error", error = %e, "database error"),
            ConnectionEvent::Disconnected => tracing::warn!(event = "disconnected", "database disconnected"),
            ConnectionEvent::Reconnected => tracing::info!(event = "reconnected", "database reconnected"),
        }
    }
}

/// Tracks whether the last ping succeeded. Starts up: the pool connected at boot.
#[derive(Debug)]
pub struct ConnectionMonitor {
    up: bool,
}

impl Default for ConnectionMonitor {
    fn default() -> Self {
        ConnectionMonitor { up: true }
    }
}

impl ConnectionMonitor {
    pub fn is_up(&self) -> bool {
        self.up
    }

    /// Events for one ping outcome. Only transitions produce events.
    pub fn observe(&mut self, outcome: Result<(), String>) -> Vec<ConnectionEvent> {
        match (self.up, outcome) {
            (true, Ok(())) | (false, Err(_)) => Vec::new(),
            (true, Err(e)) => {
                self.up = false;
                vec![ConnectionEvent::Error(e), ConnectionEvent::Disconnected]
            }
            (false, Ok(())) => {
                self.up = true;
                vec![ConnectionEvent::Reconnected]
            }
        }
    }
}

/// Ping every `interval` until the pool is closed.
pub fn spawn_monitor(pool: PgPool, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut monitor = ConnectionMonitor::default();
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if pool.is_closed() {
                break;
            }
            let outcome = sqlx::query("SELECT 1")
                .execute(&pool)
                .await
                .map(|_| ())
                .map_err(|e| e.to_string());
            for event in monitor.observe(outcome) {
                event.log();
            }
        }
        tracing::debug!("connection monitor stopped");
    })
}
