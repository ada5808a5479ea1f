use async_trait::async_trait;

use crate::commands::{Command, Invocation};
use crate::errors::{KernelError, KernelResult};
use crate::syscall::SyscallParams;
use crate::vfs::resolve_path;

/// Concatenates files, or passes stdin through when no file is named.
pub struct Cat;

#[async_trait]
impl Command for Cat {
    fn name(&self) -> &'static str {
        "cat"
    }

    fn summary(&self) -> &'static str {
        "concatenate files to standard output"
    }

    async fn run(&self, invocation: Invocation) -> KernelResult<String> {
        if invocation.args.is_empty() {
            return match invocation.stdin {
                Some(stdin) => Ok(stdin),
                None => Err(KernelError::invalid_argument("cat: missing file operand")),
            };
        }

        let mut out = String::new();
        for file in &invocation.args {
            let content = read_one(&invocation, file)
                .await
                .map_err(|e| e.with_message(format!("cat: {}", e.message())))?;
            out.push_str(&content);
        }
        Ok(out)
    }
}

async fn read_one(invocation: &Invocation, file: &str) -> KernelResult<String> {
    let path = resolve_path(file, &invocation.cwd)?;
    invocation
        .context
        .syscall(SyscallParams::FsReadFile { path })
        .await?
        .into_file_content()
}
