//! The resumable task abstraction logical processes run as.
//!
//! Process logic does not run on its own thread or coroutine. It is an
//! object the scheduler advances one [`Task::resume`] call at a time; the
//! task suspends by returning [`TaskStep::Yielded`] and finishes by
//! returning [`TaskStep::Complete`]. Logic that never needs to suspend
//! completes within its first slice.

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::errors::{KernelError, KernelResult};

/// What a task reports after consuming one scheduler slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStep {
    /// The task suspended voluntarily and wants another slice.
    Yielded,
    /// The task finished with this exit code.
    Complete(i32),
}

/// A unit of process logic the scheduler can advance stepwise.
///
/// `resume` is called at most once per scheduler tick. Returning an error
/// counts as a crash of the owning process.
#[async_trait]
pub trait Task: Send {
    async fn resume(&mut self) -> KernelResult<TaskStep>;
}

/// Runs a single future to completion within one slice.
///
/// The simplest possible task: everything the logic does, including any
/// syscalls it awaits, happens inside the first `resume`.
pub struct OneShot {
    fut: Option<BoxFuture<'static, KernelResult<i32>>>,
}

impl OneShot {
    pub fn new(fut: BoxFuture<'static, KernelResult<i32>>) -> Self {
        OneShot { fut: Some(fut) }
    }
}

#[async_trait]
impl Task for OneShot {
    async fn resume(&mut self) -> KernelResult<TaskStep> {
        match self.fut.take() {
            Some(fut) => Ok(TaskStep::Complete(fut.await?)),
            None => Err(KernelError::process_crashed(
                "task resumed after completion",
            )),
        }
    }
}
