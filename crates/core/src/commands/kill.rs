use async_trait::async_trait;
use ck_protocol::{Pid, Signal};

use crate::commands::{Command, Invocation};
use crate::errors::{KernelError, KernelResult};
use crate::syscall::SyscallParams;

/// Sends a signal to a process: `kill [-SIG] <pid>`, SIGTERM by default.
pub struct Kill;

fn usage() -> KernelError {
    KernelError::invalid_argument("kill: usage: kill <pid>")
}

fn parse(args: &[String]) -> KernelResult<(Pid, Signal)> {
    let mut signal = Signal::Term;
    let mut pid = None;
    for arg in args {
        if let Some(spec) = arg.strip_prefix('-') {
            signal = spec.parse().map_err(|_| usage())?;
        } else if pid.is_none() {
            pid = Some(arg.parse::<Pid>().map_err(|_| usage())?);
        }
    }
    pid.map(|pid| (pid, signal)).ok_or_else(usage)
}

#[async_trait]
impl Command for Kill {
    fn name(&self) -> &'static str {
        "kill"
    }

    fn summary(&self) -> &'static str {
        "send a signal to a process"
    }

    async fn run(&self, invocation: Invocation) -> KernelResult<String> {
        let (pid, signal) = parse(&invocation.args)?;
        invocation
            .context
            .syscall(SyscallParams::ProcSendSignal { pid, signal })
            .await?;
        Ok(String::new())
    }
}
