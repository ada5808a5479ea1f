//! The process table: authoritative registry of every logical process.
//!
//! The table owns records exclusively and hands out snapshots. Its lock is
//! held only for short synchronous sections and never across a suspension
//! point; the scheduler takes a record's task out before resuming it and
//! gives it back afterwards.

use chrono::Utc;
use ck_protocol::{Pid, ProcessSnapshot, ProcessStatus, Signal, WaitOutcome};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;

use crate::dmesg::DmesgRing;
use crate::errors::{KernelError, KernelResult};
use crate::process::record::{ProcessRecord, SignalHandler, SpawnSpec};
use crate::task::Task;

/// What the scheduler finds when it opens a slice for a pid.
pub(crate) enum SliceStart {
    /// A live task, taken out of the record for the duration of the step.
    Resume(Box<dyn Task>),
    /// First slice: instantiate the logic into a task.
    Build(crate::process::record::ProcessLogic, Vec<String>),
    /// The record has neither logic nor task.
    Empty,
}

/// What to do with a pid whose slice ended in a voluntary yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum YieldDisposition {
    /// Task stored back, process queued; re-append to the run queue.
    Requeue,
    /// Record gone or already terminal; drop the pid.
    Retire,
    /// Interrupt grace expired; force-kill with this signal.
    Kill(Signal),
}

/// Registry of process records keyed by pid.
pub struct ProcessTable {
    records: Mutex<HashMap<Pid, ProcessRecord>>,
    next_pid: AtomicU32,
    dmesg: Arc<DmesgRing>,
}

impl ProcessTable {
    pub fn new(dmesg: Arc<DmesgRing>) -> Self {
        ProcessTable {
            records: Mutex::new(HashMap::new()),
            next_pid: AtomicU32::new(1),
            dmesg,
        }
    }

    /// Creates a record with the next pid and `created` status.
    ///
    /// Never fails; pid allocation is monotonic and pids are not reused
    /// within a run.
    pub fn spawn(&self, spec: SpawnSpec) -> ProcessSnapshot {
        let pid = self.next_pid.fetch_add(1, Ordering::Relaxed);
        let record = ProcessRecord::new(pid, spec);
        let snapshot = record.snapshot();
        self.lock().insert(pid, record);
        snapshot
    }

    /// A snapshot of one process, if it exists.
    pub fn get(&self, pid: Pid) -> Option<ProcessSnapshot> {
        self.lock().get(&pid).map(ProcessRecord::snapshot)
    }

    /// Snapshots of every record, ordered by pid.
    pub fn list(&self) -> BTreeMap<Pid, ProcessSnapshot> {
        self.lock()
            .iter()
            .map(|(pid, record)| (*pid, record.snapshot()))
            .collect()
    }

    /// Marks a process done with `code`.
    ///
    /// Idempotent: a record already terminal is left untouched. Resolves
    /// every pending waiter.
    pub fn exit(&self, pid: Pid, code: i32) {
        let finished = {
            let mut records = self.lock();
            match records.get_mut(&pid) {
                Some(record) if !record.is_terminal() => {
                    record.status = ProcessStatus::Done;
                    record.exit_code = Some(code);
                    record.end_time = Some(Utc::now());
                    record.task = None;
                    record.logic = None;
                    record.pending_kill = None;
                    Some((record.name.clone(), std::mem::take(&mut record.waiters)))
                }
                _ => None,
            }
        };

        if let Some((name, waiters)) = finished {
            for waiter in waiters {
                let _ = waiter.send(WaitOutcome {
                    pid,
                    exit_code: code,
                });
            }
            self.dmesg
                .info(format!("proc {pid} ({name}) exited with code {code}"));
        }
    }

    /// Force-terminates a process with `signal`.
    ///
    /// Returns false when the pid is absent or the record is already
    /// terminal; repeat kills are no-ops, never errors.
    pub fn kill(&self, pid: Pid, signal: Signal) -> bool {
        let code = signal.exit_code();
        let finished = {
            let mut records = self.lock();
            match records.get_mut(&pid) {
                Some(record) if !record.is_terminal() => {
                    record.status = ProcessStatus::Killed;
                    record.exit_code = Some(code);
                    record.end_time = Some(Utc::now());
                    record.cancelled = true;
                    record.task = None;
                    record.logic = None;
                    record.pending_kill = None;
                    Some((record.name.clone(), std::mem::take(&mut record.waiters)))
                }
                _ => None,
            }
        };

        match finished {
            Some((name, waiters)) => {
                for waiter in waiters {
                    let _ = waiter.send(WaitOutcome {
                        pid,
                        exit_code: code,
                    });
                }
                self.dmesg
                    .info(format!("proc {pid} ({name}) killed by {signal}"));
                true
            }
            None => false,
        }
    }

    /// Resolves when the process reaches a terminal status.
    ///
    /// Immediate if it already has; `NotFound` if the pid was never
    /// spawned or the record was removed while waiting.
    pub async fn wait_for_exit(&self, pid: Pid) -> KernelResult<WaitOutcome> {
        let rx = {
            let mut records = self.lock();
            match records.get_mut(&pid) {
                None => {
                    return Err(KernelError::not_found(format!(
                        "wait: no such process: {pid}"
                    )))
                }
                Some(record) if record.is_terminal() => {
                    return Ok(WaitOutcome {
                        pid,
                        exit_code: record.exit_code.unwrap_or(0),
                    });
                }
                Some(record) => {
                    let (tx, rx) = oneshot::channel();
                    record.waiters.push(tx);
                    rx
                }
            }
        };

        rx.await
            .map_err(|_| KernelError::not_found(format!("wait: process {pid} removed")))
    }

    /// Delivers a signal.
    ///
    /// Returns false when the pid is absent or terminal. The signal is
    /// queued for `drain_signals` in every delivered case; a registered
    /// handler then runs instead of the default action. An unhandled
    /// interrupt marks the process cancelled and arms a force-kill that
    /// fires if the process yields through one more full slice.
    pub fn send_signal(&self, pid: Pid, signal: Signal) -> bool {
        enum Delivery {
            Handled(SignalHandler),
            KillNow,
            Deferred,
        }

        let decision = {
            let mut records = self.lock();
            match records.get_mut(&pid) {
                Some(record) if !record.is_terminal() => {
                    record.signal_queue.push(signal);
                    if signal == Signal::Int {
                        record.cancelled = true;
                    }
                    if let Some(handler) = record.handlers.get(&signal) {
                        Some(Delivery::Handled(Arc::clone(handler)))
                    } else {
                        match signal {
                            Signal::Term | Signal::Kill => Some(Delivery::KillNow),
                            Signal::Int => {
                                if record.status == ProcessStatus::Created {
                                    // Never scheduled: nothing to observe the
                                    // cancellation, kill outright.
                                    Some(Delivery::KillNow)
                                } else {
                                    record.pending_kill = Some(Signal::Int);
                                    record.grace_given = false;
                                    Some(Delivery::Deferred)
                                }
                            }
                        }
                    }
                }
                _ => None,
            }
        };

        match decision {
            None => false,
            Some(Delivery::Handled(handler)) => {
                handler(signal);
                true
            }
            Some(Delivery::KillNow) => {
                self.kill(pid, signal);
                true
            }
            Some(Delivery::Deferred) => true,
        }
    }

    /// Registers a handler for `signal`, replacing any previous one.
    ///
    /// Returns false when the pid is absent or terminal.
    pub fn register_signal_handler(
        &self,
        pid: Pid,
        signal: Signal,
        handler: SignalHandler,
    ) -> bool {
        let mut records = self.lock();
        match records.get_mut(&pid) {
            Some(record) if !record.is_terminal() => {
                record.handlers.insert(signal, handler);
                true
            }
            _ => false,
        }
    }

    /// Removes the handler for `signal`, restoring the default action.
    pub fn unregister_signal_handler(&self, pid: Pid, signal: Signal) -> bool {
        let mut records = self.lock();
        match records.get_mut(&pid) {
            Some(record) => record.handlers.remove(&signal).is_some(),
            None => false,
        }
    }

    /// Whether interrupt delivery has marked this process cancelled.
    pub fn is_cancelled(&self, pid: Pid) -> bool {
        self.lock().get(&pid).is_some_and(|r| r.cancelled)
    }

    /// Atomically empties and returns the process's pending signal queue.
    pub fn drain_signals(&self, pid: Pid) -> Vec<Signal> {
        self.lock()
            .get_mut(&pid)
            .map(|r| std::mem::take(&mut r.signal_queue))
            .unwrap_or_default()
    }

    /// Destroys a record. The only storage reclamation; pending waiters
    /// observe `NotFound`.
    pub fn remove(&self, pid: Pid) -> bool {
        self.lock().remove(&pid).is_some()
    }

    /// Drops every record and restarts pid allocation at 1.
    pub fn reset(&self) {
        self.lock().clear();
        self.next_pid.store(1, Ordering::Relaxed);
    }

    /// Opens a slice: marks the process running, accounts the tick, and
    /// yields what the scheduler should advance. None means the pid is
    /// gone or terminal and the slice is silently dropped.
    pub(crate) fn begin_slice(&self, pid: Pid) -> Option<SliceStart> {
        let mut records = self.lock();
        let record = records.get_mut(&pid)?;
        if record.is_terminal() {
            return None;
        }

        record.status = ProcessStatus::Running;
        record.cpu_ticks += 1;
        if record.start_time.is_none() {
            record.start_time = Some(Utc::now());
        }
        if record.pending_kill.is_some() {
            record.grace_given = true;
        }

        if let Some(task) = record.task.take() {
            Some(SliceStart::Resume(task))
        } else if let Some(logic) = record.logic.take() {
            Some(SliceStart::Build(logic, record.args.clone()))
        } else {
            Some(SliceStart::Empty)
        }
    }

    /// Closes a slice that ended in a voluntary yield.
    ///
    /// Stores the task back and re-queues, unless the record turned
    /// terminal mid-slice or an armed interrupt has used up its grace.
    pub(crate) fn yield_slice(&self, pid: Pid, task: Box<dyn Task>) -> YieldDisposition {
        let mut records = self.lock();
        let Some(record) = records.get_mut(&pid) else {
            return YieldDisposition::Retire;
        };
        if record.is_terminal() {
            return YieldDisposition::Retire;
        }
        if let Some(signal) = record.pending_kill {
            if record.grace_given {
                return YieldDisposition::Kill(signal);
            }
        }

        record.task = Some(task);
        record.status = ProcessStatus::Queued;
        YieldDisposition::Requeue
    }

    /// Marks a process queued when the scheduler accepts it.
    pub(crate) fn mark_queued(&self, pid: Pid) -> bool {
        let mut records = self.lock();
        match records.get_mut(&pid) {
            Some(record) if !record.is_terminal() => {
                record.status = ProcessStatus::Queued;
                true
            }
            _ => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Pid, ProcessRecord>> {
        match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    fn table() -> ProcessTable {
        ProcessTable::new(Arc::new(DmesgRing::new(64)))
    }

    #[test]
    fn spawn_assigns_monotonic_pids() {
        let table = table();
        let a = table.spawn(SpawnSpec::new("a"));
        let b = table.spawn(SpawnSpec::new("b"));
        assert_eq!(a.pid, 1);
        assert_eq!(b.pid, 2);
        assert_eq!(a.status, ProcessStatus::Created);
        assert!(a.exit_code.is_none());
    }

    #[test]
    fn exit_is_idempotent() {
        let table = table();
        let snap = table.spawn(SpawnSpec::new("worker"));

        table.exit(snap.pid, 3);
        table.exit(snap.pid, 99);

        let after = table.get(snap.pid).unwrap();
        assert_eq!(after.status, ProcessStatus::Done);
        assert_eq!(after.exit_code, Some(3));
        assert!(after.end_time.is_some());
    }

    #[test]
    fn kill_twice_is_a_no_op() {
        let table = table();
        let snap = table.spawn(SpawnSpec::new("victim"));

        assert!(table.kill(snap.pid, Signal::Kill));
        assert!(!table.kill(snap.pid, Signal::Kill));
        assert!(!table.kill(999, Signal::Kill));

        let after = table.get(snap.pid).unwrap();
        assert_eq!(after.status, ProcessStatus::Killed);
        assert_eq!(after.exit_code, Some(137));
    }

    #[test]
    fn kill_after_exit_does_not_change_outcome() {
        let table = table();
        let snap = table.spawn(SpawnSpec::new("finished"));

        table.exit(snap.pid, 0);
        assert!(!table.kill(snap.pid, Signal::Term));

        let after = table.get(snap.pid).unwrap();
        assert_eq!(after.status, ProcessStatus::Done);
        assert_eq!(after.exit_code, Some(0));
    }

    #[tokio::test]
    async fn waiters_all_observe_the_same_outcome() {
        let table = Arc::new(table());
        let snap = table.spawn(SpawnSpec::new("slowpoke"));
        let pid = snap.pid;

        let mut handles = Vec::new();
        for _ in 0..3 {
            let table = Arc::clone(&table);
            handles.push(tokio::spawn(async move { table.wait_for_exit(pid).await }));
        }

        tokio::task::yield_now().await;
        table.exit(pid, 42);

        for handle in handles {
            let outcome = handle.await.unwrap().unwrap();
            assert_eq!(outcome, WaitOutcome { pid, exit_code: 42 });
        }
    }

    #[tokio::test]
    async fn wait_on_terminal_resolves_immediately() {
        let table = table();
        let snap = table.spawn(SpawnSpec::new("done-already"));
        table.exit(snap.pid, 5);

        let outcome = table.wait_for_exit(snap.pid).await.unwrap();
        assert_eq!(outcome.exit_code, 5);
    }

    #[tokio::test]
    async fn wait_on_unknown_pid_is_not_found() {
        let table = table();
        let err = table.wait_for_exit(404).await.unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn remove_fails_pending_waiters() {
        let table = Arc::new(table());
        let snap = table.spawn(SpawnSpec::new("doomed"));
        let pid = snap.pid;

        let waiter = {
            let table = Arc::clone(&table);
            tokio::spawn(async move { table.wait_for_exit(pid).await })
        };
        tokio::task::yield_now().await;

        assert!(table.remove(pid));
        let err = waiter.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::NotFound);
    }

    #[test]
    fn sigterm_default_action_kills() {
        let table = table();
        let snap = table.spawn(SpawnSpec::new("target"));

        assert!(table.send_signal(snap.pid, Signal::Term));

        let after = table.get(snap.pid).unwrap();
        assert_eq!(after.status, ProcessStatus::Killed);
        assert_eq!(after.exit_code, Some(143));
    }

    #[test]
    fn sigint_on_created_process_kills_immediately() {
        let table = table();
        let snap = table.spawn(SpawnSpec::new("unscheduled"));

        assert!(table.send_signal(snap.pid, Signal::Int));

        let after = table.get(snap.pid).unwrap();
        assert_eq!(after.status, ProcessStatus::Killed);
        assert_eq!(after.exit_code, Some(130));
    }

    #[test]
    fn sigint_on_queued_process_defers_the_kill() {
        let table = table();
        let snap = table.spawn(SpawnSpec::new("cooperative"));
        assert!(table.mark_queued(snap.pid));

        assert!(table.send_signal(snap.pid, Signal::Int));

        // Cancelled but still alive: the process gets a slice to react.
        let after = table.get(snap.pid).unwrap();
        assert_eq!(after.status, ProcessStatus::Queued);
        assert!(table.is_cancelled(snap.pid));
    }

    #[test]
    fn handler_bypasses_default_action() {
        let table = table();
        let snap = table.spawn(SpawnSpec::new("trapper"));

        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        assert!(table.register_signal_handler(
            snap.pid,
            Signal::Term,
            Arc::new(move |_| flag.store(true, Ordering::SeqCst)),
        ));

        assert!(table.send_signal(snap.pid, Signal::Term));
        assert!(fired.load(Ordering::SeqCst));

        // Still alive; the queued signal is observable via drain.
        let after = table.get(snap.pid).unwrap();
        assert_eq!(after.status, ProcessStatus::Created);
        assert_eq!(table.drain_signals(snap.pid), vec![Signal::Term]);
        assert!(table.drain_signals(snap.pid).is_empty());
    }

    #[test]
    fn unregister_restores_default_action() {
        let table = table();
        let snap = table.spawn(SpawnSpec::new("untrapper"));

        table.register_signal_handler(snap.pid, Signal::Term, Arc::new(|_| {}));
        assert!(table.unregister_signal_handler(snap.pid, Signal::Term));

        table.send_signal(snap.pid, Signal::Term);
        assert_eq!(
            table.get(snap.pid).unwrap().status,
            ProcessStatus::Killed
        );
    }

    #[test]
    fn signal_to_terminal_process_reports_false() {
        let table = table();
        let snap = table.spawn(SpawnSpec::new("gone"));
        table.exit(snap.pid, 0);

        assert!(!table.send_signal(snap.pid, Signal::Term));
        assert!(!table.send_signal(999, Signal::Term));
    }

    #[test]
    fn reset_restarts_pid_allocation() {
        let table = table();
        table.spawn(SpawnSpec::new("one"));
        table.spawn(SpawnSpec::new("two"));

        table.reset();
        assert!(table.list().is_empty());
        assert_eq!(table.spawn(SpawnSpec::new("fresh")).pid, 1);
    }

    #[test]
    fn snapshots_are_defensive_copies() {
        let table = table();
        let snap = table.spawn(SpawnSpec::new("shielded"));

        let mut copy = table.get(snap.pid).unwrap();
        copy.status = ProcessStatus::Killed;
        copy.name = "mutated".to_string();

        let fresh = table.get(snap.pid).unwrap();
        assert_eq!(fresh.status, ProcessStatus::Created);
        assert_eq!(fresh.name, "shielded");
    }
}
