//! Process-wide counters.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sysinfo::{ProcessesToUpdate, System};
use tokio::sync::Mutex;

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    commands_handled: u64,
    messages_seen: u64,
}

/// Uptime plus command and message counters.
pub struct Stats {
    started_at: DateTime<Utc>,
    counters: Mutex<Counters>,
}

impl Stats {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            counters: Mutex::new(Counters::default()),
        }
    }

    /// Process start time; messages created at or before it are never acted on.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub async fn record_command(&self) {
        self.counters.lock().await.commands_handled += 1;
    }

    pub async fn record_message(&self) {
        self.counters.lock().await.messages_seen += 1;
    }

    pub async fn snapshot(&self) -> StatsSnapshot {
        let counters = *self.counters.lock().await;
        let uptime = (Utc::now() - self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        StatsSnapshot {
            uptime,
            commands_handled: counters.commands_handled,
            messages_seen: counters.messages_seen,
            memory_bytes: memory_usage_bytes(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub uptime: Duration,
    pub commands_handled: u64,
    pub messages_seen: u64,
    pub memory_bytes: u64,
}

impl StatsSnapshot {
    pub fn uptime_parts(&self) -> UptimeParts {
        let secs = self.uptime.as_secs();
        UptimeParts {
            days: secs / 86_400,
            hours: (secs / 3_600) % 24,
            minutes: (secs / 60) % 60,
            seconds: secs % 60,
        }
    }

    pub fn memory_mb(&self) -> f64 {
        self.memory_bytes as f64 / 1024.0 / 1024.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UptimeParts {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

/// Resident memory of this process, or 0 when the platform won't say.
fn memory_usage_bytes() -> u64 {
    let Ok(pid) = sysinfo::get_current_pid() else {
        return 0;
    };
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    system.process(pid).map(|p| p.memory()).unwrap_or(0)
}
