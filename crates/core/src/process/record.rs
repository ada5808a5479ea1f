//! The process record and its spawn specification.

use chrono::{DateTime, Utc};
use ck_protocol::{Pid, ProcessMeta, ProcessSnapshot, ProcessStatus, Signal, WaitOutcome};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::process::context::ProcessContext;
use crate::task::Task;

/// Factory invoked exactly once, on the first scheduler slice, to produce
/// the process's resumable task.
pub type ProcessLogic = Box<dyn FnOnce(Vec<String>, ProcessContext) -> Box<dyn Task> + Send>;

/// A registered signal callback.
///
/// Invoked synchronously at delivery, outside the table lock, bypassing
/// the signal's default action.
pub type SignalHandler = Arc<dyn Fn(Signal) + Send + Sync>;

/// Everything needed to create a process.
pub struct SpawnSpec {
    pub name: String,
    pub args: Vec<String>,
    pub ppid: Pid,
    pub meta: ProcessMeta,
    pub logic: Option<ProcessLogic>,
}

impl SpawnSpec {
    /// A kernel-parented spec with no arguments and no logic.
    pub fn new(name: impl Into<String>) -> Self {
        SpawnSpec {
            name: name.into(),
            args: Vec::new(),
            ppid: 0,
            meta: ProcessMeta::default(),
            logic: None,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_ppid(mut self, ppid: Pid) -> Self {
        self.ppid = ppid;
        self
    }

    pub fn with_meta(mut self, meta: ProcessMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.meta.command = Some(command.into());
        self
    }

    pub fn with_logic(mut self, logic: ProcessLogic) -> Self {
        self.logic = Some(logic);
        self
    }
}

/// One entry of the process table.
///
/// Owned exclusively by [`table::ProcessTable`]; everyone else sees
/// [`ProcessSnapshot`] copies.
///
/// [`table::ProcessTable`]: crate::process::table::ProcessTable
pub(crate) struct ProcessRecord {
    pub pid: Pid,
    pub ppid: Pid,
    pub name: String,
    pub args: Vec<String>,
    pub status: ProcessStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub exit_code: Option<i32>,
    pub cpu_ticks: u64,
    pub meta: ProcessMeta,

    /// Consumed on the first slice to build `task`.
    pub logic: Option<ProcessLogic>,

    /// The live resumable task, present only between slices. The scheduler
    /// takes it out for the duration of a `resume` call.
    pub task: Option<Box<dyn Task>>,

    /// Set by interrupt delivery; observable via the context.
    pub cancelled: bool,

    /// A deferred force-kill armed by an unhandled interrupt.
    pub pending_kill: Option<Signal>,

    /// True once the process has started the one slice it is granted
    /// after `pending_kill` was armed.
    pub grace_given: bool,

    /// Signals delivered but not yet drained by the logic.
    pub signal_queue: Vec<Signal>,

    /// Registered handlers, overriding default actions per signal.
    pub handlers: HashMap<Signal, SignalHandler>,

    /// Resolved exactly once, when the record turns terminal.
    pub waiters: Vec<oneshot::Sender<WaitOutcome>>,
}

impl ProcessRecord {
    pub(crate) fn new(pid: Pid, spec: SpawnSpec) -> Self {
        ProcessRecord {
            pid,
            ppid: spec.ppid,
            name: spec.name,
            args: spec.args,
            status: ProcessStatus::Created,
            start_time: None,
            end_time: None,
            exit_code: None,
            cpu_ticks: 0,
            meta: spec.meta,
            logic: spec.logic,
            task: None,
            cancelled: false,
            pending_kill: None,
            grace_given: false,
            signal_queue: Vec::new(),
            handlers: HashMap::new(),
            waiters: Vec::new(),
        }
    }

    /// A defensive copy of the observable fields.
    pub(crate) fn snapshot(&self) -> ProcessSnapshot {
        ProcessSnapshot {
            pid: self.pid,
            ppid: self.ppid,
            name: self.name.clone(),
            args: self.args.clone(),
            status: self.status,
            start_time: self.start_time,
            end_time: self.end_time,
            exit_code: self.exit_code,
            cpu_ticks: self.cpu_ticks,
            meta: self.meta.clone(),
        }
    }

    pub(crate) fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
