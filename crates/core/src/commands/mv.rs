use async_trait::async_trait;

use crate::commands::{Command, Invocation};
use crate::errors::{KernelError, KernelResult};
use crate::syscall::SyscallParams;
use crate::vfs::resolve_path;

/// Moves or renames. A destination that is an existing directory
/// receives the source under its own name.
pub struct Mv;

#[async_trait]
impl Command for Mv {
    fn name(&self) -> &'static str {
        "mv"
    }

    fn summary(&self) -> &'static str {
        "move or rename files"
    }

    async fn run(&self, invocation: Invocation) -> KernelResult<String> {
        let operands: Vec<&String> = invocation
            .args
            .iter()
            .filter(|a| !a.starts_with('-'))
            .collect();
        let [source, destination] = operands.as_slice() else {
            return Err(KernelError::invalid_argument(
                "mv: missing file operand\nUsage: mv <source> <destination>",
            ));
        };

        rename(&invocation, source, destination)
            .await
            .map_err(|e| e.with_message(format!("mv: {}", e.message())))?;
        Ok(String::new())
    }
}

async fn rename(invocation: &Invocation, source: &str, destination: &str) -> KernelResult<()> {
    let source = resolve_path(source, &invocation.cwd)?;
    let destination = resolve_path(destination, &invocation.cwd)?;
    invocation
        .context
        .syscall(SyscallParams::FsMove {
            source,
            destination,
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::detached_invocation;

    #[tokio::test]
    async fn requires_both_operands() {
        let err = Mv.run(detached_invocation(&["lonely"])).await.unwrap_err();
        assert!(err.message().starts_with("mv: missing file operand"));
    }
}
