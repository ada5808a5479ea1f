use async_trait::async_trait;

use crate::commands::{Command, Invocation};
use crate::errors::{KernelError, KernelResult};
use crate::syscall::SyscallParams;
use crate::vfs::resolve_path;

/// Creates or overwrites a file. Piped input becomes the file content;
/// without it the file is empty.
pub struct Touch;

#[async_trait]
impl Command for Touch {
    fn name(&self) -> &'static str {
        "touch"
    }

    fn summary(&self) -> &'static str {
        "create an empty file"
    }

    async fn run(&self, invocation: Invocation) -> KernelResult<String> {
        let Some(target) = invocation.args.first() else {
            return Err(KernelError::invalid_argument("touch: missing file operand"));
        };

        let content = invocation.stdin.clone().unwrap_or_default();
        write(&invocation, target, content).await.map_err(|e| {
            e.with_message(format!("touch: cannot touch '{target}': {}", e.message()))
        })?;
        Ok(String::new())
    }
}

async fn write(invocation: &Invocation, target: &str, content: String) -> KernelResult<()> {
    let path = resolve_path(target, &invocation.cwd)?;
    invocation
        .context
        .syscall(SyscallParams::FsWriteFile {
            path,
            content,
            append: false,
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::detached_invocation;
    use crate::errors::ErrorKind;

    #[tokio::test]
    async fn missing_operand_is_rejected() {
        let err = Touch.run(detached_invocation(&[])).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.message(), "touch: missing file operand");
    }
}
