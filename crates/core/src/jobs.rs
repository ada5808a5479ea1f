//! Background job bookkeeping.
//!
//! A job is the pid group of one background pipeline plus the command
//! line it was launched with. Entries whose processes have all finished
//! (or vanished) are pruned the next time the table is queried.

use ck_protocol::{JobId, JobSnapshot, Pid};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::process::ProcessTable;

struct JobEntry {
    pids: Vec<Pid>,
    command_line: String,
}

impl JobEntry {
    fn snapshot(&self, id: JobId) -> JobSnapshot {
        JobSnapshot {
            id,
            pids: self.pids.clone(),
            command_line: self.command_line.clone(),
        }
    }

    fn is_finished(&self, table: &ProcessTable) -> bool {
        self.pids
            .iter()
            .all(|&pid| table.get(pid).map_or(true, |snap| snap.status.is_terminal()))
    }
}

pub struct JobTable {
    entries: Mutex<BTreeMap<JobId, JobEntry>>,
    next_id: AtomicU64,
    processes: Arc<ProcessTable>,
}

impl JobTable {
    pub fn new(processes: Arc<ProcessTable>) -> Self {
        JobTable {
            entries: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            processes,
        }
    }

    /// Records a new job and returns its number. Numbers are monotonic
    /// and never reused within a kernel run.
    pub fn register(&self, pids: Vec<Pid>, command_line: impl Into<String>) -> JobId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(
            id,
            JobEntry {
                pids,
                command_line: command_line.into(),
            },
        );
        id
    }

    /// Lists live jobs in numeric order, pruning finished ones first.
    pub fn snapshots(&self) -> Vec<JobSnapshot> {
        let mut entries = self.lock();
        entries.retain(|_, entry| !entry.is_finished(&self.processes));
        entries
            .iter()
            .map(|(&id, entry)| entry.snapshot(id))
            .collect()
    }

    /// Removes and returns a job, for foregrounding.
    pub fn take(&self, id: JobId) -> Option<JobSnapshot> {
        self.lock().remove(&id).map(|entry| entry.snapshot(id))
    }

    /// Drops every entry and restarts numbering at 1.
    pub fn reset(&self) {
        self.lock().clear();
        self.next_id.store(1, Ordering::Relaxed);
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<JobId, JobEntry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dmesg::DmesgRing;
    use crate::process::SpawnSpec;

    fn fixture() -> (Arc<ProcessTable>, JobTable) {
        let table = Arc::new(ProcessTable::new(Arc::new(DmesgRing::new(16))));
        let jobs = JobTable::new(Arc::clone(&table));
        (table, jobs)
    }

    #[test]
    fn numbers_are_monotonic() {
        let (_, jobs) = fixture();
        assert_eq!(jobs.register(vec![1], "sleep 5 &"), 1);
        assert_eq!(jobs.register(vec![2, 3], "a | b &"), 2);
    }

    #[test]
    fn snapshots_prune_finished_jobs() {
        let (table, jobs) = fixture();
        let live = table.spawn(SpawnSpec::new("sleep"));
        let dead = table.spawn(SpawnSpec::new("echo"));
        table.exit(dead.pid, 0);

        let running = jobs.register(vec![live.pid], "sleep 10 &");
        jobs.register(vec![dead.pid], "echo hi &");
        jobs.register(vec![999], "ghost &");

        let snaps = jobs.snapshots();
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].id, running);
        assert_eq!(snaps[0].command_line, "sleep 10 &");

        // pruned for good, not just filtered
        assert!(jobs.take(running).is_some());
        assert!(jobs.snapshots().is_empty());
    }

    #[test]
    fn take_removes_the_entry() {
        let (table, jobs) = fixture();
        let snap = table.spawn(SpawnSpec::new("sleep"));
        let id = jobs.register(vec![snap.pid], "sleep 30 &");

        let job = jobs.take(id).unwrap();
        assert_eq!(job.pids, vec![snap.pid]);
        assert!(jobs.take(id).is_none());
    }

    #[test]
    fn reset_restarts_numbering() {
        let (table, jobs) = fixture();
        let snap = table.spawn(SpawnSpec::new("sleep"));
        jobs.register(vec![snap.pid], "sleep 1 &");
        jobs.reset();
        assert!(jobs.snapshots().is_empty());
        assert_eq!(jobs.register(vec![snap.pid], "sleep 2 &"), 1);
    }
}
