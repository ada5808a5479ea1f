use async_trait::async_trait;

use crate::commands::{Command, Invocation};
use crate::errors::{KernelError, KernelResult};
use crate::syscall::SyscallParams;
use crate::vfs::resolve_path;

/// Creates a directory. `-p` creates missing parents and tolerates an
/// existing target.
pub struct Mkdir;

#[async_trait]
impl Command for Mkdir {
    fn name(&self) -> &'static str {
        "mkdir"
    }

    fn summary(&self) -> &'static str {
        "create a directory"
    }

    async fn run(&self, invocation: Invocation) -> KernelResult<String> {
        let create_parents = invocation.args.iter().any(|a| a == "-p");
        let Some(target) = invocation.args.iter().find(|a| !a.starts_with('-')) else {
            return Err(KernelError::invalid_argument("mkdir: missing operand"));
        };

        make(&invocation, target, create_parents)
            .await
            .map_err(|e| {
                e.with_message(format!(
                    "mkdir: cannot create directory '{target}': {}",
                    e.message()
                ))
            })?;
        Ok(String::new())
    }
}

async fn make(invocation: &Invocation, target: &str, create_parents: bool) -> KernelResult<()> {
    let path = resolve_path(target, &invocation.cwd)?;
    invocation
        .context
        .syscall(SyscallParams::FsMakeDir {
            path,
            create_parents,
        })
        .await?;
    Ok(())
}
