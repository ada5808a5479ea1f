use async_trait::async_trait;

use crate::commands::{Command, Invocation};
use crate::errors::KernelResult;
use crate::syscall::SyscallParams;

/// Tabulates every process record, live and finished.
pub struct Ps;

#[async_trait]
impl Command for Ps {
    fn name(&self) -> &'static str {
        "ps"
    }

    fn summary(&self) -> &'static str {
        "report process status"
    }

    async fn run(&self, invocation: Invocation) -> KernelResult<String> {
        let processes = invocation
            .context
            .syscall(SyscallParams::ProcList)
            .await?
            .into_process_list()?;

        let mut lines = vec!["PID\tSTATUS\t\tCOMMAND".to_string()];
        for (pid, snapshot) in &processes {
            lines.push(format!(
                "{pid}\t{:<8}\t{}",
                snapshot.status.to_string(),
                snapshot.display_command()
            ));
        }
        Ok(format!("{}\n", lines.join("\n")))
    }
}
