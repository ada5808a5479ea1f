use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

use crate::commands::{Command, Invocation, Launch};
use crate::errors::{KernelError, KernelResult};
use crate::process::ProcessContext;
use crate::task::{Task, TaskStep};

/// Pauses for a number of seconds.
///
/// Runs as a resumable task: every slice it checks its deadline and
/// yields, so other processes keep running underneath it. A delivered
/// interrupt ends it early with the conventional `128 + 2`.
pub struct Sleep;

struct SleepTask {
    args: Vec<String>,
    context: ProcessContext,
    deadline: Option<Instant>,
}

fn parse_seconds(args: &[String]) -> KernelResult<Duration> {
    let Some(arg) = args.first() else {
        return Err(KernelError::invalid_argument("sleep: missing operand"));
    };
    match arg.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Ok(Duration::from_secs_f64(secs)),
        _ => Err(KernelError::invalid_argument(format!(
            "sleep: invalid time interval '{arg}'"
        ))),
    }
}

#[async_trait]
impl Task for SleepTask {
    async fn resume(&mut self) -> KernelResult<TaskStep> {
        if self.context.is_cancelled() {
            return Ok(TaskStep::Complete(130));
        }

        let deadline = match self.deadline {
            Some(deadline) => deadline,
            None => {
                let deadline = Instant::now() + parse_seconds(&self.args)?;
                self.deadline = Some(deadline);
                deadline
            }
        };

        if Instant::now() >= deadline {
            Ok(TaskStep::Complete(0))
        } else {
            Ok(TaskStep::Yielded)
        }
    }
}

#[async_trait]
impl Command for Sleep {
    fn name(&self) -> &'static str {
        "sleep"
    }

    fn summary(&self) -> &'static str {
        "pause for a number of seconds"
    }

    async fn run(&self, _invocation: Invocation) -> KernelResult<String> {
        Err(KernelError::process_crashed(
            "sleep runs as a scheduled task",
        ))
    }

    fn launch(&self, invocation: Invocation) -> Launch {
        Launch::Task(Box::new(SleepTask {
            args: invocation.args,
            context: invocation.context,
            deadline: None,
        }))
    }
}
