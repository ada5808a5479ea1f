//! Runtime process state models.
//!
//! This module defines the structures for tracking the state of logical
//! processes managed by the kernel: their lifecycle status, the snapshots
//! handed out by the process table, and the outcome delivered to waiters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a logical process.
///
/// Assigned monotonically starting at 1 and never reused within a kernel
/// run. `0` is reserved for the kernel itself as the root parent.
pub type Pid = u32;

/// Represents the current lifecycle status of a logical process.
///
/// The status progresses through these states during normal execution:
/// Created -> Queued -> Running -> (Queued <-> Running)* -> Done
///
/// Special states:
/// - Created: spawned but never handed to the scheduler
/// - Killed: forcibly terminated by a signal
///
/// `Done` and `Killed` are terminal; a record never leaves them.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    /// Process record exists but has never been enqueued.
    Created,

    /// Process is waiting in the scheduler run queue.
    Queued,

    /// Process is consuming its scheduler slice right now.
    Running,

    /// Process finished voluntarily; `exit_code` carries its result.
    Done,

    /// Process was terminated by a signal; `exit_code` is `128 + signal`.
    Killed,
}

impl ProcessStatus {
    /// Returns true for the two states a process can never leave.
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessStatus::Done | ProcessStatus::Killed)
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessStatus::Created => "created",
            ProcessStatus::Queued => "queued",
            ProcessStatus::Running => "running",
            ProcessStatus::Done => "done",
            ProcessStatus::Killed => "killed",
        };
        write!(f, "{s}")
    }
}

/// Auxiliary process data carried for display purposes.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessMeta {
    /// The full command line this process was spawned from, if any.
    ///
    /// Process listings prefer this over the bare name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

/// A point-in-time copy of a process record.
///
/// Snapshots are defensive: mutating one never affects the process table.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSnapshot {
    /// Unique identifier of the process.
    pub pid: Pid,

    /// Parent pid; `0` for kernel-spawned roots. Informational only.
    pub ppid: Pid,

    /// Command name this process runs.
    pub name: String,

    /// Ordered argument list.
    pub args: Vec<String>,

    /// Current lifecycle status.
    pub status: ProcessStatus,

    /// Set when the scheduler grants the first slice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    /// Set exactly once, on entering a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// None until terminal; then the exit code or `128 + signal`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    /// Number of scheduler slices this process has consumed.
    pub cpu_ticks: u64,

    /// Display metadata.
    #[serde(default)]
    pub meta: ProcessMeta,
}

impl ProcessSnapshot {
    /// The string a process listing shows in its COMMAND column.
    pub fn display_command(&self) -> &str {
        self.meta.command.as_deref().unwrap_or(&self.name)
    }
}

/// Delivered to every waiter when a process reaches a terminal status.
///
/// All waiters on the same pid observe the identical outcome.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WaitOutcome {
    pub pid: Pid,
    pub exit_code: i32,
}
