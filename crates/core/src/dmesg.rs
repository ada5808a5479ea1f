//! Bounded kernel log ring.
//!
//! Kernel subsystems report through here. Every record lands in a bounded
//! ring (oldest dropped at capacity) and is mirrored to `tracing`, so the
//! `dmesg` command and the host process log see the same stream.

use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

/// Severity of a kernel log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// One kernel log record.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub ts: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogRecord {
    /// The `<iso-timestamp> <level> <message>` line `dmesg` prints.
    pub fn render(&self) -> String {
        format!(
            "{} {} {}",
            self.ts.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.level,
            self.message
        )
    }
}

/// The ring itself. Cheap to share behind an `Arc`.
pub struct DmesgRing {
    records: Mutex<VecDeque<LogRecord>>,
    capacity: usize,
}

impl DmesgRing {
    /// Creates a ring retaining at most `capacity` records.
    pub fn new(capacity: usize) -> Self {
        DmesgRing {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity,
        }
    }

    /// Appends a record, dropping the oldest one at capacity.
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info => tracing::info!(target: "dmesg", "{message}"),
            LogLevel::Warn => tracing::warn!(target: "dmesg", "{message}"),
            LogLevel::Error => tracing::error!(target: "dmesg", "{message}"),
        }

        let mut records = lock_ring(&self.records);
        records.push_back(LogRecord {
            ts: Utc::now(),
            level,
            message,
        });
        while records.len() > self.capacity {
            records.pop_front();
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// A copy of the retained records, oldest first.
    pub fn records(&self) -> Vec<LogRecord> {
        lock_ring(&self.records).iter().cloned().collect()
    }

    /// Empties the ring.
    pub fn clear(&self) {
        lock_ring(&self.records).clear();
    }
}

fn lock_ring(m: &Mutex<VecDeque<LogRecord>>) -> std::sync::MutexGuard<'_, VecDeque<LogRecord>> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
