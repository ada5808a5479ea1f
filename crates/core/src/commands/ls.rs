use async_trait::async_trait;
use ck_protocol::{ReadDirOptions, ReadDirReply};

use crate::commands::{Command, Invocation};
use crate::errors::KernelResult;
use crate::syscall::SyscallParams;
use crate::vfs::resolve_path;

/// Lists a directory. `-a` shows hidden entries, `-l` the long format.
pub struct Ls;

#[async_trait]
impl Command for Ls {
    fn name(&self) -> &'static str {
        "ls"
    }

    fn summary(&self) -> &'static str {
        "list directory contents"
    }

    async fn run(&self, invocation: Invocation) -> KernelResult<String> {
        let mut options = ReadDirOptions::default();
        let mut target = None;
        for arg in &invocation.args {
            if let Some(flags) = arg.strip_prefix('-') {
                options.show_hidden |= flags.contains('a');
                options.long_format |= flags.contains('l');
            } else if target.is_none() {
                target = Some(arg.as_str());
            }
        }
        let target = target.unwrap_or(".");

        let listing = list(&invocation, target, options)
            .await
            .map_err(|e| {
                e.with_message(format!("ls: cannot access '{target}': {}", e.message()))
            })?;

        Ok(render(&listing))
    }
}

async fn list(
    invocation: &Invocation,
    target: &str,
    options: ReadDirOptions,
) -> KernelResult<ReadDirReply> {
    let path = resolve_path(target, &invocation.cwd)?;
    invocation
        .context
        .syscall(SyscallParams::FsReadDir { path, options })
        .await?
        .into_dir_listing()
}

fn render(listing: &ReadDirReply) -> String {
    match listing {
        ReadDirReply::Names(names) => {
            if names.is_empty() {
                String::new()
            } else {
                format!("{}\n", names.join("  "))
            }
        }
        ReadDirReply::Entries(entries) => {
            if entries.is_empty() {
                return String::new();
            }
            let lines: Vec<String> = entries
                .iter()
                .map(|e| {
                    let kind = if e.is_directory { 'd' } else { '-' };
                    format!(
                        "{kind} {:>8} {} {}",
                        e.size,
                        e.mtime.format("%Y-%m-%d %H:%M"),
                        e.name
                    )
                })
                .collect();
            format!("{}\n", lines.join("\n"))
        }
    }
}
