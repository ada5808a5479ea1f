//! Pipeline orchestration.
//!
//! A pipeline is a list of stages sharing one carry value: each stage's
//! output becomes the next stage's stdin. Every stage runs as its own
//! scheduled process; the driver enqueues them strictly left to right,
//! awaiting each stage's exit before starting the next, so the carry is
//! written before it is read no matter how many slices a stage takes.

use async_trait::async_trait;
use ck_protocol::{Pid, PipelineReceipt, Signal, StageSink, StageSpec};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::commands::{Command, Invocation, Launch};
use crate::errors::{KernelError, KernelResult};
use crate::kernel::Kernel;
use crate::process::{ProcessContext, SpawnSpec};
use crate::syscall::SyscallParams;
use crate::task::{Task, TaskStep};
use crate::vfs::resolve_path;

/// Receives terminal-bound output and stage error reports.
pub type DisplayFn = Arc<dyn Fn(String) + Send + Sync>;

/// A fully described pipeline launch.
pub struct PipelineRequest {
    pub stages: Vec<StageSpec>,
    pub background: bool,
    /// Explicit initial stdin. Wins over the first stage's input file.
    pub stdin: Option<String>,
    /// Directory stage-relative paths resolve against.
    pub cwd: String,
    /// The original command line, recorded on background jobs.
    pub command_line: String,
    pub display: DisplayFn,
}

/// State shared by every stage of one pipeline run.
struct StageShared {
    carry: Mutex<Option<String>>,
    error: Mutex<Option<String>>,
}

impl StageShared {
    fn new(initial: Option<String>) -> Self {
        StageShared {
            carry: Mutex::new(initial),
            error: Mutex::new(None),
        }
    }

    fn take_carry(&self) -> Option<String> {
        lock(&self.carry).take()
    }

    fn put_carry(&self, output: String) {
        *lock(&self.carry) = Some(output);
    }

    fn record_error(&self, message: String) {
        *lock(&self.error) = Some(message);
    }

    fn take_error(&self) -> Option<String> {
        lock(&self.error).take()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

enum StageRoute {
    /// Feed the carry for the next stage.
    Intermediate,
    /// Final stage: honor the sink.
    Last { sink: StageSink, display: DisplayFn },
}

/// The task a stage process runs.
///
/// On its first slice it takes the carry as stdin and launches the
/// command; one-shot commands finish right there, task-based ones are
/// stepped on every following slice. Command failures are not crashes:
/// the message is recorded for the driver and the stage exits 1.
struct StageTask {
    command: Option<Arc<dyn Command>>,
    args: Vec<String>,
    cwd: String,
    context: ProcessContext,
    shared: Arc<StageShared>,
    route: StageRoute,
    inner: Option<Box<dyn Task>>,
}

impl StageTask {
    async fn finish(&mut self, output: String) -> KernelResult<TaskStep> {
        match &self.route {
            StageRoute::Intermediate => {
                self.shared.put_carry(output);
                Ok(TaskStep::Complete(0))
            }
            StageRoute::Last { sink, display } => match sink {
                StageSink::Terminal => {
                    if !output.is_empty() {
                        display(output);
                    }
                    Ok(TaskStep::Complete(0))
                }
                StageSink::Redirect { file, append } => {
                    let written = self
                        .context
                        .syscall(SyscallParams::FsWriteFile {
                            path: file.clone(),
                            content: output,
                            append: *append,
                        })
                        .await;
                    match written {
                        Ok(_) => Ok(TaskStep::Complete(0)),
                        Err(e) => Ok(self.fail(e)),
                    }
                }
            },
        }
    }

    fn fail(&self, err: KernelError) -> TaskStep {
        self.shared.record_error(err.message().to_string());
        TaskStep::Complete(1)
    }

    async fn step_inner(&mut self, mut task: Box<dyn Task>) -> KernelResult<TaskStep> {
        match task.resume().await {
            Ok(TaskStep::Yielded) => {
                self.inner = Some(task);
                Ok(TaskStep::Yielded)
            }
            // tasks carry no output; an empty finish still honors the sink
            Ok(TaskStep::Complete(0)) => self.finish(String::new()).await,
            Ok(TaskStep::Complete(code)) => Ok(TaskStep::Complete(code)),
            Err(e) => Ok(self.fail(e)),
        }
    }
}

#[async_trait]
impl Task for StageTask {
    async fn resume(&mut self) -> KernelResult<TaskStep> {
        if let Some(task) = self.inner.take() {
            return self.step_inner(task).await;
        }

        let Some(command) = self.command.take() else {
            return Err(KernelError::process_crashed(
                "task resumed after completion",
            ));
        };
        let invocation = Invocation {
            args: std::mem::take(&mut self.args),
            stdin: self.shared.take_carry(),
            cwd: self.cwd.clone(),
            context: self.context.clone(),
        };
        match command.launch(invocation) {
            Launch::OneShot(invocation) => match command.run(invocation).await {
                Ok(output) => self.finish(output).await,
                Err(e) => Ok(self.fail(e)),
            },
            Launch::Task(task) => self.step_inner(task).await,
        }
    }
}

/// Runs a pipeline to its receipt.
///
/// Stage names resolve before anything spawns; an unknown command fails
/// the whole pipeline with no side effects. Background pipelines return
/// immediately with their pids and job id; foreground ones carry the
/// final exit code.
pub async fn run_pipeline(
    kernel: &Arc<Kernel>,
    request: PipelineRequest,
) -> KernelResult<PipelineReceipt> {
    let PipelineRequest {
        stages,
        background,
        stdin,
        cwd,
        command_line,
        display,
    } = request;

    if stages.is_empty() {
        return Ok(PipelineReceipt {
            pids: Vec::new(),
            status: None,
            job: None,
        });
    }

    let mut commands = Vec::with_capacity(stages.len());
    for stage in &stages {
        let command = kernel.commands().resolve(&stage.name).ok_or_else(|| {
            KernelError::not_found(format!("{}: command not found", stage.name))
        })?;
        commands.push(command);
    }

    let mut initial = stdin;
    if initial.is_none() {
        if let Some(file) = stages[0].stdin_file.as_deref() {
            let path = resolve_path(file, &cwd)?;
            initial = Some(kernel.vfs().read_file(&path).await?);
        }
    }

    // resolve the sink before anything spawns, like the stage names
    let last = stages.len() - 1;
    let mut final_sink = Some(match stages[last].sink.clone() {
        StageSink::Redirect { file, append } => StageSink::Redirect {
            file: resolve_path(&file, &cwd)?,
            append,
        },
        sink => sink,
    });

    let shared = Arc::new(StageShared::new(initial));
    let mut pids = Vec::with_capacity(stages.len());
    for (index, (stage, command)) in stages.iter().zip(commands).enumerate() {
        let route = if index == last {
            StageRoute::Last {
                sink: final_sink.take().unwrap_or(StageSink::Terminal),
                display: Arc::clone(&display),
            }
        } else {
            StageRoute::Intermediate
        };

        let stage_shared = Arc::clone(&shared);
        let stage_cwd = cwd.clone();
        let spec = SpawnSpec::new(&stage.name)
            .with_args(stage.args.clone())
            .with_command(stage.display_command())
            .with_logic(Box::new(move |args, context| {
                Box::new(StageTask {
                    command: Some(command),
                    args,
                    cwd: stage_cwd,
                    context,
                    shared: stage_shared,
                    route,
                    inner: None,
                })
            }));
        let snapshot = kernel.processes().spawn(spec);
        pids.push(snapshot.pid);
    }

    if background {
        let job = kernel.jobs().register(pids.clone(), command_line);
        let driver_kernel = Arc::clone(kernel);
        let driver_pids = pids.clone();
        let driver_shared = Arc::clone(&shared);
        let driver_display = Arc::clone(&display);
        tokio::spawn(async move {
            let _ = drive(&driver_kernel, &driver_pids, &driver_shared, &driver_display).await;
        });
        return Ok(PipelineReceipt {
            pids,
            status: None,
            job: Some(job),
        });
    }

    let status = drive(kernel, &pids, &shared, &display).await?;
    Ok(PipelineReceipt {
        pids,
        status: Some(status),
        job: None,
    })
}

/// Sequences the stages: enqueue, await exit, move on. A nonzero exit
/// reports any recorded stage error and puts down the stages that never
/// started, so every pid of an aborted pipeline reaches a terminal
/// status and its job stays prunable.
async fn drive(
    kernel: &Arc<Kernel>,
    pids: &[Pid],
    shared: &Arc<StageShared>,
    display: &DisplayFn,
) -> KernelResult<i32> {
    let mut status = 0;
    for (index, &pid) in pids.iter().enumerate() {
        kernel.scheduler().enqueue(pid);
        let outcome = kernel.processes().wait_for_exit(pid).await?;
        status = outcome.exit_code;
        if outcome.exit_code != 0 {
            if let Some(message) = shared.take_error() {
                display(message);
            }
            for &rest in &pids[index + 1..] {
                kernel.processes().kill(rest, Signal::Kill);
            }
            break;
        }
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Cat, Echo, Grep};
    use std::sync::Weak;

    fn detached_context() -> ProcessContext {
        ProcessContext::new(1, 0, Default::default(), Weak::<Kernel>::new())
    }

    fn capture() -> (DisplayFn, Arc<Mutex<Vec<String>>>) {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let writer = Arc::clone(&sink);
        let display: DisplayFn = Arc::new(move |s| writer.lock().unwrap().push(s));
        (display, sink)
    }

    fn stage(
        command: Arc<dyn Command>,
        args: &[&str],
        shared: &Arc<StageShared>,
        route: StageRoute,
    ) -> StageTask {
        StageTask {
            command: Some(command),
            args: args.iter().map(|s| s.to_string()).collect(),
            cwd: "/".to_string(),
            context: detached_context(),
            shared: Arc::clone(shared),
            route,
            inner: None,
        }
    }

    #[tokio::test]
    async fn final_stage_output_reaches_the_display() {
        let shared = Arc::new(StageShared::new(None));
        let (display, seen) = capture();
        let mut task = stage(
            Arc::new(Echo),
            &["hello"],
            &shared,
            StageRoute::Last {
                sink: StageSink::Terminal,
                display,
            },
        );

        assert_eq!(task.resume().await.unwrap(), TaskStep::Complete(0));
        assert_eq!(*seen.lock().unwrap(), vec!["hello\n".to_string()]);
    }

    #[tokio::test]
    async fn intermediate_output_feeds_the_next_stage() {
        let shared = Arc::new(StageShared::new(None));
        let (display, seen) = capture();

        let mut first = stage(Arc::new(Echo), &["web", "dev"], &shared, StageRoute::Intermediate);
        assert_eq!(first.resume().await.unwrap(), TaskStep::Complete(0));

        let mut second = stage(
            Arc::new(Grep),
            &["web"],
            &shared,
            StageRoute::Last {
                sink: StageSink::Terminal,
                display,
            },
        );
        assert_eq!(second.resume().await.unwrap(), TaskStep::Complete(0));
        assert_eq!(*seen.lock().unwrap(), vec!["web dev\n".to_string()]);
    }

    #[tokio::test]
    async fn command_failure_records_the_message_and_exits_one() {
        let shared = Arc::new(StageShared::new(None));
        let (display, seen) = capture();
        let mut task = stage(
            Arc::new(Cat),
            &[],
            &shared,
            StageRoute::Last {
                sink: StageSink::Terminal,
                display,
            },
        );

        assert_eq!(task.resume().await.unwrap(), TaskStep::Complete(1));
        assert_eq!(
            shared.take_error(),
            Some("cat: missing file operand".to_string())
        );
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_terminal_output_is_suppressed() {
        let shared = Arc::new(StageShared::new(Some(String::new())));
        let (display, seen) = capture();
        let mut task = stage(
            Arc::new(Cat),
            &[],
            &shared,
            StageRoute::Last {
                sink: StageSink::Terminal,
                display,
            },
        );

        assert_eq!(task.resume().await.unwrap(), TaskStep::Complete(0));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn a_stage_cannot_be_resumed_after_completion() {
        let shared = Arc::new(StageShared::new(None));
        let mut task = stage(Arc::new(Echo), &[], &shared, StageRoute::Intermediate);
        task.resume().await.unwrap();
        assert!(task.resume().await.is_err());
    }
}
