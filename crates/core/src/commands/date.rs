use async_trait::async_trait;
use chrono::Utc;

use crate::commands::{Command, Invocation};
use crate::errors::KernelResult;

/// Prints the current time.
pub struct Date;

#[async_trait]
impl Command for Date {
    fn name(&self) -> &'static str {
        "date"
    }

    fn summary(&self) -> &'static str {
        "print the current date and time"
    }

    async fn run(&self, _invocation: Invocation) -> KernelResult<String> {
        Ok(format!("{}\n", Utc::now().to_rfc2822()))
    }
}
