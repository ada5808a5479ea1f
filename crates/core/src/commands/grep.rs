use async_trait::async_trait;

use crate::commands::{Command, Invocation};
use crate::errors::{KernelError, KernelResult};
use crate::syscall::SyscallParams;
use crate::vfs::resolve_path;

/// Substring line filter over stdin or files. `-i` ignores case.
pub struct Grep;

#[async_trait]
impl Command for Grep {
    fn name(&self) -> &'static str {
        "grep"
    }

    fn summary(&self) -> &'static str {
        "print lines matching a pattern"
    }

    async fn run(&self, invocation: Invocation) -> KernelResult<String> {
        let ignore_case = invocation.args.iter().any(|a| a == "-i");
        let mut operands = invocation.args.iter().filter(|a| !a.starts_with('-'));
        let Some(pattern) = operands.next() else {
            return Err(KernelError::invalid_argument(
                "usage: grep [-i] <pattern> [file...]",
            ));
        };
        let files: Vec<&String> = operands.collect();

        let haystack = if files.is_empty() {
            invocation.stdin.clone().unwrap_or_default()
        } else {
            let mut combined = String::new();
            for file in files {
                let content = read_one(&invocation, file)
                    .await
                    .map_err(|e| {
                        e.with_message(format!("grep: {file}: {}", e.message()))
                    })?;
                combined.push_str(&content);
            }
            combined
        };

        let needle = if ignore_case {
            pattern.to_lowercase()
        } else {
            pattern.clone()
        };
        let matches: Vec<&str> = haystack
            .lines()
            .filter(|line| {
                if ignore_case {
                    line.to_lowercase().contains(&needle)
                } else {
                    line.contains(needle.as_str())
                }
            })
            .collect();

        if matches.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!("{}\n", matches.join("\n")))
        }
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
