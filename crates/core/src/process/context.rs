//! The execution context handed to process logic.
//!
//! A context is the only capability a logical process holds: identity,
//! display metadata, the syscall doorway, and its own signal state. It
//! keeps a weak kernel reference so a torn-down kernel fails syscalls
//! instead of leaking the whole subsystem graph through its processes.

use ck_protocol::{Pid, ProcessMeta, Signal};
use std::sync::Weak;

use crate::errors::{KernelError, KernelResult};
use crate::kernel::Kernel;
use crate::process::record::SignalHandler;
use crate::syscall::{SyscallParams, SyscallReply};

#[derive(Clone)]
pub struct ProcessContext {
    pub pid: Pid,
    pub ppid: Pid,
    pub meta: ProcessMeta,
    kernel: Weak<Kernel>,
}

impl ProcessContext {
    pub(crate) fn new(pid: Pid, ppid: Pid, meta: ProcessMeta, kernel: Weak<Kernel>) -> Self {
        ProcessContext {
            pid,
            ppid,
            meta,
            kernel,
        }
    }

    /// Issues a syscall through the gateway.
    ///
    /// # Errors
    ///
    /// Whatever the handler returns, plus `IoFailure` when the kernel has
    /// been torn down underneath the process.
    pub async fn syscall(&self, params: SyscallParams) -> KernelResult<SyscallReply> {
        match self.kernel.upgrade() {
            Some(kernel) => kernel.gateway().emit(params).await,
            None => Err(KernelError::io_failure("kernel is shut down")),
        }
    }

    /// Registers a handler for `signal` on the owning process.
    pub fn on_signal(&self, signal: Signal, handler: SignalHandler) -> bool {
        match self.kernel.upgrade() {
            Some(kernel) => kernel
                .processes()
                .register_signal_handler(self.pid, signal, handler),
            None => false,
        }
    }

    /// True once an interrupt has been delivered to this process.
    pub fn is_cancelled(&self) -> bool {
        match self.kernel.upgrade() {
            Some(kernel) => kernel.processes().is_cancelled(self.pid),
            None => true,
        }
    }

    /// Empties and returns the pending signal queue.
    pub fn drain_signals(&self) -> Vec<Signal> {
        match self.kernel.upgrade() {
            Some(kernel) => kernel.processes().drain_signals(self.pid),
            None => Vec::new(),
        }
    }
}
