use async_trait::async_trait;

use crate::commands::{Command, Invocation};
use crate::errors::KernelResult;

/// Writes its arguments back out, space-separated.
pub struct Echo;

#[async_trait]
impl Command for Echo {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn summary(&self) -> &'static str {
        "print arguments to standard output"
    }

    async fn run(&self, invocation: Invocation) -> KernelResult<String> {
        Ok(format!("{}\n", invocation.args.join(" ")))
    }
}
