//! Cooperative round-robin scheduler.
//!
//! One queued process is advanced by exactly one task step per tick. The
//! run queue is strict FIFO: a process that yields goes to the tail and
//! every other queued process runs before it sees the CPU again. Ticks are
//! serialized; the driver waits for the dispatched step to finish before
//! arming the next tick, so two slices never overlap.

use ck_protocol::Pid;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, Weak};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_stream::{wrappers::IntervalStream, StreamExt};

use crate::dmesg::DmesgRing;
use crate::kernel::Kernel;
use crate::process::context::ProcessContext;
use crate::process::table::{ProcessTable, SliceStart, YieldDisposition};
use crate::task::TaskStep;

pub struct Scheduler {
    table: Arc<ProcessTable>,
    dmesg: Arc<DmesgRing>,
    tick_ms: u64,
    queue: Mutex<VecDeque<Pid>>,
    driver: Mutex<Option<JoinHandle<()>>>,
    shutdown: Arc<Notify>,
    kernel: OnceLock<Weak<Kernel>>,
}

impl Scheduler {
    pub fn new(table: Arc<ProcessTable>, dmesg: Arc<DmesgRing>, tick_ms: u64) -> Self {
        Scheduler {
            table,
            dmesg,
            tick_ms,
            queue: Mutex::new(VecDeque::new()),
            driver: Mutex::new(None),
            shutdown: Arc::new(Notify::new()),
            kernel: OnceLock::new(),
        }
    }

    /// Wires the back-reference used to build process contexts. Called
    /// once during kernel construction.
    pub(crate) fn bind_kernel(&self, kernel: Weak<Kernel>) {
        let _ = self.kernel.set(kernel);
    }

    /// Appends a process to the run queue tail and marks it queued.
    ///
    /// No-op (returning false) for unknown or terminal pids.
    pub fn enqueue(&self, pid: Pid) -> bool {
        if !self.table.mark_queued(pid) {
            return false;
        }
        self.lock_queue().push_back(pid);
        true
    }

    /// Advances the head-of-queue process by one slice.
    ///
    /// An empty queue, a vanished pid or a terminal record make this a
    /// silent no-op. Logic errors become an exit with code 1; the tick
    /// itself never fails.
    pub async fn tick(&self) {
        let Some(pid) = self.lock_queue().pop_front() else {
            return;
        };

        let mut task = match self.table.begin_slice(pid) {
            None => return,
            Some(SliceStart::Resume(task)) => task,
            Some(SliceStart::Build(logic, args)) => {
                let context = self.context_for(pid);
                logic(args, context)
            }
            Some(SliceStart::Empty) => {
                self.dmesg
                    .error(format!("proc {pid} has no logic to run"));
                self.table.exit(pid, 1);
                return;
            }
        };

        match task.resume().await {
            Ok(TaskStep::Complete(code)) => self.table.exit(pid, code),
            Ok(TaskStep::Yielded) => match self.table.yield_slice(pid, task) {
                YieldDisposition::Requeue => self.lock_queue().push_back(pid),
                YieldDisposition::Retire => {}
                YieldDisposition::Kill(signal) => {
                    self.dmesg
                        .warn(format!("proc {pid} ignored {signal}, killing"));
                    self.table.kill(pid, signal);
                }
            },
            Err(e) => {
                self.dmesg.error(format!("proc {pid} failed: {e}"));
                self.table.exit(pid, 1);
            }
        }
    }

    /// Installs the periodic tick driver. Idempotent.
    pub fn start(self: &Arc<Self>) {
        let mut driver = self.lock_driver();
        if driver.is_some() {
            return;
        }

        let scheduler = Arc::clone(self);
        let shutdown = Arc::clone(&self.shutdown);
        let tick_ms = self.tick_ms;
        *driver = Some(tokio::spawn(async move {
            let mut ticks =
                IntervalStream::new(tokio::time::interval(Duration::from_millis(tick_ms)));
            loop {
                tokio::select! {
                    maybe_tick = ticks.next() => {
                        if maybe_tick.is_some() {
                            scheduler.tick().await;
                        }
                    }
                    _ = shutdown.notified() => break,
                }
            }
        }));
        self.dmesg.info("Scheduler started");
    }

    /// Removes the tick driver, finishing any slice in flight. Idempotent.
    pub async fn stop(&self) {
        let handle = self.lock_driver().take();
        if let Some(handle) = handle {
            self.shutdown.notify_one();
            let _ = handle.await;
            self.dmesg.info("Scheduler stopped");
        }
    }

    /// Drops every queued pid. Process records are untouched.
    pub fn reset_queue(&self) {
        self.lock_queue().clear();
    }

    fn context_for(&self, pid: Pid) -> ProcessContext {
        let (ppid, meta) = self
            .table
            .get(pid)
            .map(|snap| (snap.ppid, snap.meta))
            .unwrap_or_default();
        let kernel = self
            .kernel
            .get()
            .cloned()
            .unwrap_or_else(Weak::new);
        ProcessContext::new(pid, ppid, meta, kernel)
    }

    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<Pid>> {
        match self.queue.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_driver(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.driver.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{KernelError, KernelResult};
    use crate::process::record::SpawnSpec;
    use crate::task::{OneShot, Task};
    use async_trait::async_trait;
    use ck_protocol::{ProcessStatus, Signal};

    fn fixture() -> (Arc<ProcessTable>, Arc<Scheduler>) {
        let dmesg = Arc::new(DmesgRing::new(64));
        let table = Arc::new(ProcessTable::new(Arc::clone(&dmesg)));
        let scheduler = Arc::new(Scheduler::new(Arc::clone(&table), dmesg, 5));
        (table, scheduler)
    }

    /// Yields `yields` times, then completes with `code`.
    struct Stepper {
        yields: u32,
        code: i32,
    }

    #[async_trait]
    impl Task for Stepper {
        async fn resume(&mut self) -> KernelResult<TaskStep> {
            if self.yields == 0 {
                return Ok(TaskStep::Complete(self.code));
            }
            self.yields -= 1;
            Ok(TaskStep::Yielded)
        }
    }

    fn stepper_spec(name: &str, yields: u32, code: i32) -> SpawnSpec {
        SpawnSpec::new(name)
            .with_logic(Box::new(move |_, _| Box::new(Stepper { yields, code })))
    }

    #[tokio::test]
    async fn single_slice_process_completes_in_one_tick() {
        let (table, scheduler) = fixture();
        let snap = table.spawn(stepper_spec("quick", 0, 0));
        assert!(scheduler.enqueue(snap.pid));

        scheduler.tick().await;

        let after = table.get(snap.pid).unwrap();
        assert_eq!(after.status, ProcessStatus::Done);
        assert_eq!(after.exit_code, Some(0));
        assert_eq!(after.cpu_ticks, 1);
        assert!(after.start_time.is_some());
    }

    #[tokio::test]
    async fn yielding_process_requeues_at_the_tail() {
        let (table, scheduler) = fixture();
        let long = table.spawn(stepper_spec("long", 2, 0));
        let short = table.spawn(stepper_spec("short", 0, 0));
        scheduler.enqueue(long.pid);
        scheduler.enqueue(short.pid);

        // long yields and goes behind short
        scheduler.tick().await;
        assert_eq!(table.get(long.pid).unwrap().status, ProcessStatus::Queued);

        scheduler.tick().await;
        assert_eq!(table.get(short.pid).unwrap().status, ProcessStatus::Done);
        assert_eq!(table.get(long.pid).unwrap().status, ProcessStatus::Queued);

        scheduler.tick().await;
        scheduler.tick().await;
        let done = table.get(long.pid).unwrap();
        assert_eq!(done.status, ProcessStatus::Done);
        assert_eq!(done.cpu_ticks, 3);
    }

    #[tokio::test]
    async fn fifo_order_is_preserved() {
        let (table, scheduler) = fixture();
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut pids = Vec::new();
        for name in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            let spec = SpawnSpec::new(name).with_logic(Box::new(move |_, ctx| {
                Box::new(OneShot::new(Box::pin(async move {
                    order.lock().unwrap().push(ctx.pid);
                    Ok(0)
                })))
            }));
            let snap = table.spawn(spec);
            scheduler.enqueue(snap.pid);
            pids.push(snap.pid);
        }

        for _ in 0..3 {
            scheduler.tick().await;
        }
        assert_eq!(*order.lock().unwrap(), pids);
    }

    #[tokio::test]
    async fn crashing_logic_exits_with_code_one() {
        let (table, scheduler) = fixture();
        let spec = SpawnSpec::new("crasher").with_logic(Box::new(|_, _| {
            Box::new(OneShot::new(Box::pin(async {
                Err(KernelError::process_crashed("boom"))
            })))
        }));
        let snap = table.spawn(spec);
        scheduler.enqueue(snap.pid);

        scheduler.tick().await;

        let after = table.get(snap.pid).unwrap();
        assert_eq!(after.status, ProcessStatus::Done);
        assert_eq!(after.exit_code, Some(1));
    }

    #[tokio::test]
    async fn process_without_logic_fails() {
        let (table, scheduler) = fixture();
        let snap = table.spawn(SpawnSpec::new("hollow"));
        scheduler.enqueue(snap.pid);

        scheduler.tick().await;

        let after = table.get(snap.pid).unwrap();
        assert_eq!(after.exit_code, Some(1));
    }

    #[tokio::test]
    async fn enqueue_rejects_unknown_and_terminal_pids() {
        let (table, scheduler) = fixture();
        assert!(!scheduler.enqueue(404));

        let snap = table.spawn(stepper_spec("done", 0, 0));
        table.exit(snap.pid, 0);
        assert!(!scheduler.enqueue(snap.pid));

        // queue stayed empty
        scheduler.tick().await;
    }

    #[tokio::test]
    async fn interrupt_grants_one_slice_then_kills() {
        let (table, scheduler) = fixture();
        let snap = table.spawn(stepper_spec("stubborn", 100, 0));
        scheduler.enqueue(snap.pid);

        scheduler.tick().await;
        assert!(table.send_signal(snap.pid, Signal::Int));
        assert_eq!(table.get(snap.pid).unwrap().status, ProcessStatus::Queued);

        // the grace slice: the process yields again and is put down
        scheduler.tick().await;

        let after = table.get(snap.pid).unwrap();
        assert_eq!(after.status, ProcessStatus::Killed);
        assert_eq!(after.exit_code, Some(130));
    }

    #[tokio::test]
    async fn kill_mid_queue_retires_the_pid_silently() {
        let (table, scheduler) = fixture();
        let snap = table.spawn(stepper_spec("victim", 5, 0));
        scheduler.enqueue(snap.pid);
        scheduler.tick().await;

        assert!(table.kill(snap.pid, Signal::Kill));
        // the queued pid is now terminal; the next tick drops it
        scheduler.tick().await;

        let after = table.get(snap.pid).unwrap();
        assert_eq!(after.status, ProcessStatus::Killed);
        assert_eq!(after.cpu_ticks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn driver_advances_processes_on_its_own() {
        let (table, scheduler) = fixture();
        let snap = table.spawn(stepper_spec("driven", 2, 0));
        scheduler.enqueue(snap.pid);

        scheduler.start();
        scheduler.start(); // idempotent

        tokio::time::sleep(Duration::from_millis(100)).await;
        scheduler.stop().await;
        scheduler.stop().await; // idempotent

        let after = table.get(snap.pid).unwrap();
        assert_eq!(after.status, ProcessStatus::Done);
        assert_eq!(after.cpu_ticks, 3);
    }
}
