use async_trait::async_trait;

use crate::commands::{Command, Invocation};
use crate::errors::{KernelError, KernelResult};
use crate::syscall::SyscallParams;
use crate::vfs::resolve_path;

/// Removes files and directories. `-f` tolerates missing targets; `-r`
/// is accepted for familiarity, though the storage side removes
/// directories recursively either way.
pub struct Rm;

#[async_trait]
impl Command for Rm {
    fn name(&self) -> &'static str {
        "rm"
    }

    fn summary(&self) -> &'static str {
        "remove files or directories"
    }

    async fn run(&self, invocation: Invocation) -> KernelResult<String> {
        let force = invocation.args.iter().any(|a| a == "-f");
        let recursive = invocation.args.iter().any(|a| a == "-r");
        let targets: Vec<&String> = invocation
            .args
            .iter()
            .filter(|a| !a.starts_with('-'))
            .collect();
        if targets.is_empty() {
            return Err(KernelError::invalid_argument("rm: missing operand"));
        }

        for target in targets {
            remove(&invocation, target, force, recursive)
                .await
                .map_err(|e| {
                    e.with_message(format!(
                        "rm: cannot remove '{target}': {}",
                        e.message()
                    ))
                })?;
        }
        Ok(String::new())
    }
}

async fn remove(
    invocation: &Invocation,
    target: &str,
    force: bool,
    recursive: bool,
) -> KernelResult<()> {
    let path = resolve_path(target, &invocation.cwd)?;
    invocation
        .context
        .syscall(SyscallParams::FsRemove {
            path,
            force,
            recursive,
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::detached_invocation;

    #[tokio::test]
    async fn flags_alone_are_not_operands() {
        let err = Rm.run(detached_invocation(&["-f", "-r"])).await.unwrap_err();
        assert_eq!(err.message(), "rm: missing operand");
    }
}
