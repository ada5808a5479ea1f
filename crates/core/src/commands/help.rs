use async_trait::async_trait;

use crate::commands::{Command, Invocation};
use crate::errors::KernelResult;

/// Lists every registered command with its summary.
///
/// The listing is captured at registry construction, after all other
/// commands are in place.
pub struct Help {
    entries: Vec<(String, String)>,
}

impl Help {
    pub const COMMAND_NAME: &'static str = "help";
    pub const COMMAND_SUMMARY: &'static str = "list available commands";

    pub fn new(entries: Vec<(String, String)>) -> Self {
        Help { entries }
    }
}

#[async_trait]
impl Command for Help {
    fn name(&self) -> &'static str {
        Help::COMMAND_NAME
    }

    fn summary(&self) -> &'static str {
        Help::COMMAND_SUMMARY
    }

    async fn run(&self, _invocation: Invocation) -> KernelResult<String> {
        let lines: Vec<String> = self
            .entries
            .iter()
            .map(|(name, summary)| format!("{name:<10} {summary}"))
            .collect();
        Ok(format!("{}\n", lines.join("\n")))
    }
}
