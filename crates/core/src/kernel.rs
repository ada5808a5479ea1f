//! Kernel assembly and lifecycle.
//!
//! [`Kernel::new`] wires every subsystem together and hands back the
//! shared handle everything else borrows: the process table, scheduler,
//! syscall gateway, command registry, job table and VFS adapter. State is
//! instance-owned; two kernels in one process never share anything.

use std::sync::Arc;

use crate::commands::CommandRegistry;
use crate::config::KernelConfig;
use crate::dmesg::DmesgRing;
use crate::errors::KernelResult;
use crate::jobs::JobTable;
use crate::process::ProcessTable;
use crate::scheduler::Scheduler;
use crate::syscall::{install_syscalls, SyscallGateway, SyscallParams, SyscallReply};
use crate::vfs::{VfsBackend, VfsClient};

pub struct Kernel {
    config: KernelConfig,
    dmesg: Arc<DmesgRing>,
    table: Arc<ProcessTable>,
    scheduler: Arc<Scheduler>,
    gateway: SyscallGateway,
    commands: CommandRegistry,
    jobs: JobTable,
    vfs: VfsClient,
}

impl Kernel {
    /// Builds a kernel on the given storage backend and installs the
    /// full syscall table.
    pub fn new(config: KernelConfig, backend: Arc<dyn VfsBackend>) -> Arc<Kernel> {
        let dmesg = Arc::new(DmesgRing::new(config.kernel.dmesg_capacity));
        let table = Arc::new(ProcessTable::new(Arc::clone(&dmesg)));
        let scheduler = Arc::new(Scheduler::new(
            Arc::clone(&table),
            Arc::clone(&dmesg),
            config.kernel.tick_ms,
        ));
        let commands = CommandRegistry::with_defaults(Arc::clone(&dmesg));
        let jobs = JobTable::new(Arc::clone(&table));
        let gateway = SyscallGateway::new(Arc::clone(&dmesg));
        let vfs = VfsClient::new(backend);

        let kernel = Arc::new(Kernel {
            config,
            dmesg,
            table,
            scheduler,
            gateway,
            commands,
            jobs,
            vfs,
        });
        kernel.scheduler.bind_kernel(Arc::downgrade(&kernel));
        install_syscalls(&kernel);
        kernel
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn dmesg(&self) -> &Arc<DmesgRing> {
        &self.dmesg
    }

    pub fn processes(&self) -> &Arc<ProcessTable> {
        &self.table
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn gateway(&self) -> &SyscallGateway {
        &self.gateway
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    pub fn vfs(&self) -> &VfsClient {
        &self.vfs
    }

    /// Convenience pass-through to the gateway.
    pub async fn syscall(&self, params: SyscallParams) -> KernelResult<SyscallReply> {
        self.gateway.emit(params).await
    }

    /// Logs the staged boot lines and starts the tick driver.
    pub fn boot(self: &Arc<Self>) {
        self.dmesg.info("Initializing kernel");
        self.dmesg.info("Setting up process handlers");
        self.scheduler.start();
        self.dmesg.info("Boot completed");
    }

    /// Stops the tick driver, letting any slice in flight finish.
    pub async fn shutdown(&self) {
        self.scheduler.stop().await;
        self.dmesg.info("Kernel halted");
    }

    /// Drops all processes, queued work and jobs. Pid and job numbering
    /// restart at 1. The tick driver is left as it was.
    pub fn reset(&self) {
        self.scheduler.reset_queue();
        self.table.reset();
        self.jobs.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::SpawnSpec;
    use crate::task::OneShot;
    use crate::vfs::MemVfs;
    use ck_protocol::ProcessStatus;
    use std::time::Duration;

    fn kernel() -> Arc<Kernel> {
        Kernel::new(KernelConfig::default(), Arc::new(MemVfs::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn boot_drives_enqueued_processes() {
        let kernel = kernel();
        kernel.boot();

        let spec = SpawnSpec::new("noop").with_logic(Box::new(|_, _| {
            Box::new(OneShot::new(Box::pin(async { Ok(0) })))
        }));
        let snapshot = kernel.processes().spawn(spec);
        kernel.scheduler().enqueue(snapshot.pid);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(
            kernel.processes().get(snapshot.pid).unwrap().status,
            ProcessStatus::Done
        );
        kernel.shutdown().await;
    }

    #[tokio::test]
    async fn syscalls_reach_the_installed_handlers() {
        let kernel = kernel();
        let reply = kernel.syscall(SyscallParams::ProcList).await.unwrap();
        assert!(reply.into_process_list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reset_restarts_pid_numbering() {
        let kernel = kernel();
        let first = kernel.processes().spawn(SpawnSpec::new("a"));
        assert_eq!(first.pid, 1);

        kernel.reset();
        let again = kernel.processes().spawn(SpawnSpec::new("b"));
        assert_eq!(again.pid, 1);
    }

    #[tokio::test]
    async fn two_kernels_do_not_share_state() {
        let one = kernel();
        let two = kernel();
        one.processes().spawn(SpawnSpec::new("solo"));
        assert_eq!(one.processes().list().len(), 1);
        assert!(two.processes().list().is_empty());
    }
}
