//! Pipeline stage descriptors, receipts and background jobs.
//!
//! A parsed command line becomes a list of [`StageSpec`]s; the kernel
//! answers a pipeline request with a [`PipelineReceipt`]; background
//! launches are tracked as jobs and reported as [`JobSnapshot`]s.

use serde::{Deserialize, Serialize};

use crate::process_models::Pid;

/// Identifier of a background job, monotonically assigned per shell.
pub type JobId = u64;

/// Where a stage's output goes.
///
/// Only the final stage of a pipeline consults its sink; intermediate
/// stages always feed the next stage's stdin.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StageSink {
    /// Hand the output to the caller's display callback.
    Terminal,
    /// Write the output to a file instead of displaying it.
    Redirect {
        file: String,
        #[serde(default)]
        append: bool,
    },
}

impl Default for StageSink {
    fn default() -> Self {
        StageSink::Terminal
    }
}

/// One stage of a parsed pipeline.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StageSpec {
    /// Command name to resolve against the registry.
    pub name: String,

    /// Arguments after redirection tokens have been stripped.
    #[serde(default)]
    pub args: Vec<String>,

    /// Output routing for this stage.
    #[serde(default, rename = "stdout")]
    pub sink: StageSink,

    /// `< file` input redirection. Honored on the first stage only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin_file: Option<String>,
}

impl StageSpec {
    /// A bare stage with terminal output and no input redirection.
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        StageSpec {
            name: name.into(),
            args,
            sink: StageSink::default(),
            stdin_file: None,
        }
    }

    /// The `name args...` string stored as process metadata.
    pub fn display_command(&self) -> String {
        if self.args.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, self.args.join(" "))
        }
    }
}

/// What a pipeline request returns.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReceipt {
    /// Pids of every stage, in pipeline order.
    pub pids: Vec<Pid>,

    /// Final stage's exit code. Foreground only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,

    /// Registered job id. Background only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<JobId>,
}

/// A background job as reported by the `jobs` builtin.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: JobId,

    /// Member pids in pipeline order; the last one defines completion.
    pub pids: Vec<Pid>,

    /// The command line the job was launched with.
    pub command_line: String,
}
