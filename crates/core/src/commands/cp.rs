use async_trait::async_trait;

use crate::commands::{Command, Invocation};
use crate::errors::{KernelError, KernelResult};
use crate::syscall::SyscallParams;
use crate::vfs::resolve_path;

/// Copies a file, or a directory tree with `-r`.
pub struct Cp;

#[async_trait]
impl Command for Cp {
    fn name(&self) -> &'static str {
        "cp"
    }

    fn summary(&self) -> &'static str {
        "copy files and directories"
    }

    async fn run(&self, invocation: Invocation) -> KernelResult<String> {
        let recursive = invocation.args.iter().any(|a| a == "-r");
        let operands: Vec<&String> = invocation
            .args
            .iter()
            .filter(|a| !a.starts_with('-'))
            .collect();
        let [source, destination] = operands.as_slice() else {
            return Err(KernelError::invalid_argument(
                "cp: missing file operand\nUsage: cp [-r] <source> <destination>",
            ));
        };

        copy(&invocation, source, destination, recursive)
            .await
            .map_err(|e| e.with_message(format!("cp: {}", e.message())))?;
        Ok(String::new())
    }
}

async fn copy(
    invocation: &Invocation,
    source: &str,
    destination: &str,
    recursive: bool,
) -> KernelResult<()> {
    let source = resolve_path(source, &invocation.cwd)?;
    let destination = resolve_path(destination, &invocation.cwd)?;
    invocation
        .context
        .syscall(SyscallParams::FsCopy {
            source,
            destination,
            recursive,
        })
        .await?;
    Ok(())
}
