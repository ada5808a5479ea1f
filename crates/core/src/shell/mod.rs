//! The shell driving the kernel.
//!
//! The binary feeds the shell one line at a time; there is no line
//! editing here. The shell parses the line, answers builtins directly
//! (they run outside the scheduler, so they may await `proc.wait`
//! freely), and submits everything else as a `proc.pipeline` syscall.
//! All output, including error lines, goes through the display callback.

pub mod parse;

pub use parse::{parse_line, ParsedLine};

use ck_protocol::JobId;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::{KernelError, KernelResult};
use crate::kernel::Kernel;
use crate::pipeline::{DisplayFn, PipelineRequest};
use crate::syscall::SyscallParams;
use crate::vfs::resolve_path;

/// What the caller should do after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellOutcome {
    Continue,
    Exit,
}

const BUILTINS: &[&str] = &[
    "cd", "jobs", "fg", "bg", "env", "export", "clear", "exit",
];

pub struct Shell {
    kernel: Arc<Kernel>,
    display: DisplayFn,
    env: BTreeMap<String, String>,
    cwd: String,
}

impl Shell {
    /// A shell seeded from the kernel's `[shell]` config section.
    pub fn new(kernel: Arc<Kernel>, display: DisplayFn) -> Self {
        let section = &kernel.config().shell;
        let mut env = BTreeMap::new();
        env.insert("USER".to_string(), section.user.clone());
        env.insert("HOME".to_string(), section.home.clone());
        env.insert("PWD".to_string(), section.home.clone());
        let cwd = section.home.clone();
        Shell {
            kernel,
            display,
            env,
            cwd,
        }
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    pub fn user(&self) -> &str {
        self.env.get("USER").map_or("user", String::as_str)
    }

    fn home(&self) -> &str {
        self.env.get("HOME").map_or("/", String::as_str)
    }

    /// The cwd as shown in the prompt: `~`-relative under home.
    pub fn display_cwd(&self) -> String {
        let home = self.home();
        if self.cwd == home {
            "~".to_string()
        } else if home != "/" && self.cwd.starts_with(&format!("{home}/")) {
            format!("~{}", &self.cwd[home.len()..])
        } else {
            self.cwd.clone()
        }
    }

    /// Runs one command line to completion (foreground) or launch
    /// (background). Never panics and never returns an error: failures
    /// are reported through the display callback.
    pub async fn run_line(&mut self, line: &str) -> ShellOutcome {
        let line = line.trim();
        if line.is_empty() {
            return ShellOutcome::Continue;
        }

        let parsed = match parse_line(line, &self.hash_env()) {
            Ok(parsed) => parsed,
            Err(err) => {
                (self.display)(err.message().to_string());
                return ShellOutcome::Continue;
            }
        };
        let Some(first) = parsed.stages.first() else {
            return ShellOutcome::Continue;
        };

        if BUILTINS.contains(&first.name.as_str()) {
            let name = first.name.clone();
            let args = first.args.clone();
            return self.run_builtin(&name, &args).await;
        }

        self.submit(parsed, line).await;
        ShellOutcome::Continue
    }

    fn hash_env(&self) -> std::collections::HashMap<String, String> {
        self.env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    async fn submit(&self, parsed: ParsedLine, line: &str) {
        let request = PipelineRequest {
            stages: parsed.stages,
            background: parsed.background,
            stdin: None,
            cwd: self.cwd.clone(),
            command_line: line.to_string(),
            display: Arc::clone(&self.display),
        };
        match self.kernel.syscall(SyscallParams::ProcPipeline(request)).await {
            Ok(reply) => {
                if let Ok(receipt) = reply.into_pipeline() {
                    if let Some(job) = receipt.job {
                        let pids: Vec<String> =
                            receipt.pids.iter().map(ToString::to_string).collect();
                        (self.display)(format!("[{job}] {}", pids.join(" ")));
                    }
                }
            }
            Err(err) => (self.display)(err.message().to_string()),
        }
    }

    async fn run_builtin(&mut self, name: &str, args: &[String]) -> ShellOutcome {
        let result = match name {
            "cd" => self.cd(args).await,
            "jobs" => self.jobs(),
            "fg" => self.fg(args).await,
            "bg" => self.bg(args),
            "env" => self.print_env(),
            "export" => self.export(args),
            "clear" => Ok("\x1b[2J\x1b[1;1H".to_string()),
            "exit" => return ShellOutcome::Exit,
            _ => unreachable!("unregistered builtin {name}"),
        };
        match result {
            Ok(output) if output.is_empty() => {}
            Ok(output) => (self.display)(output),
            Err(err) => (self.display)(err.message().to_string()),
        }
        ShellOutcome::Continue
    }

    async fn cd(&mut self, args: &[String]) -> KernelResult<String> {
        let target = args
            .first()
            .map_or_else(|| self.home().to_string(), Clone::clone);
        let path = resolve_path(&target, &self.cwd)
            .map_err(|err| err.with_message(format!("cd: {target}: {}", err.message())))?;
        let stat = self
            .kernel
            .vfs()
            .stat(&path)
            .await
            .map_err(|err| err.with_message(format!("cd: {target}: {}", err.message())))?;
        if !stat.is_directory {
            return Err(KernelError::not_a_directory(format!(
                "cd: {target}: Not a directory"
            )));
        }
        self.env.insert("PWD".to_string(), path.clone());
        self.cwd = path;
        Ok(String::new())
    }

    fn jobs(&self) -> KernelResult<String> {
        let lines: Vec<String> = self
            .kernel
            .jobs()
            .snapshots()
            .into_iter()
            .map(|job| format!("[{}] {}", job.id, job.command_line))
            .collect();
        Ok(lines.join("\n"))
    }

    fn parse_job_id(&self, builtin: &str, args: &[String]) -> KernelResult<JobId> {
        match args.first() {
            Some(arg) => {
                let digits = arg.strip_prefix('%').unwrap_or(arg);
                digits.parse().map_err(|_| {
                    KernelError::not_found(format!("{builtin}: {arg}: no such job"))
                })
            }
            // no argument: the most recent job
            None => self
                .kernel
                .jobs()
                .snapshots()
                .last()
                .map(|job| job.id)
                .ok_or_else(|| KernelError::not_found(format!("{builtin}: no current job"))),
        }
    }

    /// Brings a job to the foreground: reprint its command line, await
    /// its last pid, drop the job entry.
    async fn fg(&mut self, args: &[String]) -> KernelResult<String> {
        let id = self.parse_job_id("fg", args)?;
        let job = self
            .kernel
            .jobs()
            .take(id)
            .ok_or_else(|| KernelError::not_found(format!("fg: %{id}: no such job")))?;
        (self.display)(job.command_line.clone());
        if let Some(&last) = job.pids.last() {
            self.kernel.processes().wait_for_exit(last).await?;
        }
        Ok(String::new())
    }

    /// Jobs here never stop, so `bg` only reports that the job is
    /// already running.
    fn bg(&self, args: &[String]) -> KernelResult<String> {
        let id = self.parse_job_id("bg", args)?;
        let jobs = self.kernel.jobs().snapshots();
        let job = jobs
            .iter()
            .find(|job| job.id == id)
            .ok_or_else(|| KernelError::not_found(format!("bg: %{id}: no such job")))?;
        Ok(format!("[{}] {} &", job.id, job.command_line))
    }

    fn print_env(&self) -> KernelResult<String> {
        let lines: Vec<String> = self
            .env
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        Ok(lines.join("\n"))
    }

    fn export(&mut self, args: &[String]) -> KernelResult<String> {
        if args.is_empty() {
            return self.print_env();
        }
        for arg in args {
            let Some((key, value)) = arg.split_once('=') else {
                return Err(KernelError::invalid_argument(format!(
                    "export: `{arg}': not a valid identifier"
                )));
            };
            if key.is_empty()
                || !key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(KernelError::invalid_argument(format!(
                    "export: `{arg}': not a valid identifier"
                )));
            }
            self.env.insert(key.to_string(), value.to_string());
        }
        Ok(String::new())
    }
}
