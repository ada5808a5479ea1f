//! Typed syscall requests and replies.

use ck_protocol::{
    FileStat, Pid, PipelineReceipt, ProcessSnapshot, ReadDirOptions, ReadDirReply, Signal,
};
use std::collections::BTreeMap;

use crate::errors::{KernelError, KernelResult};
use crate::pipeline::PipelineRequest;
use crate::process::SpawnSpec;

/// A syscall request, one variant per registered operation.
///
/// The variant name doubles as the registry key via [`SyscallParams::name`],
/// so a request always dispatches to the handler installed for it.
pub enum SyscallParams {
    /// Create a process record; `enqueue` hands it to the scheduler too.
    ProcSpawn { spec: SpawnSpec, enqueue: bool },
    /// Run a pipeline of command stages.
    ProcPipeline(PipelineRequest),
    /// Snapshot every process record.
    ProcList,
    /// Force-terminate a process (SIGKILL semantics).
    ProcKill { pid: Pid },
    /// Await a process's terminal state.
    ProcWait { pid: Pid },
    /// Deliver a signal to a process.
    ProcSendSignal { pid: Pid, signal: Signal },
    FsReadDir {
        path: String,
        options: ReadDirOptions,
    },
    FsReadFile { path: String },
    FsWriteFile {
        path: String,
        content: String,
        append: bool,
    },
    FsMakeDir {
        path: String,
        create_parents: bool,
    },
    FsRemove {
        path: String,
        force: bool,
        recursive: bool,
    },
    FsMove {
        source: String,
        destination: String,
    },
    FsCopy {
        source: String,
        destination: String,
        recursive: bool,
    },
    FsStat { path: String },
}

impl SyscallParams {
    /// The gateway registry key this request dispatches under.
    pub fn name(&self) -> &'static str {
        match self {
            SyscallParams::ProcSpawn { .. } => "proc.spawn",
            SyscallParams::ProcPipeline(_) => "proc.pipeline",
            SyscallParams::ProcList => "proc.list",
            SyscallParams::ProcKill { .. } => "proc.kill",
            SyscallParams::ProcWait { .. } => "proc.wait",
            SyscallParams::ProcSendSignal { .. } => "proc.sendSignal",
            SyscallParams::FsReadDir { .. } => "fs.readDir",
            SyscallParams::FsReadFile { .. } => "fs.readFile",
            SyscallParams::FsWriteFile { .. } => "fs.writeFile",
            SyscallParams::FsMakeDir { .. } => "fs.makeDir",
            SyscallParams::FsRemove { .. } => "fs.remove",
            SyscallParams::FsMove { .. } => "fs.move",
            SyscallParams::FsCopy { .. } => "fs.copy",
            SyscallParams::FsStat { .. } => "fs.stat",
        }
    }
}

/// What a syscall handler resolves with.
#[derive(Debug, Clone)]
pub enum SyscallReply {
    Process(ProcessSnapshot),
    ProcessList(BTreeMap<Pid, ProcessSnapshot>),
    Flag(bool),
    Wait(ck_protocol::WaitOutcome),
    Pipeline(PipelineReceipt),
    DirListing(ReadDirReply),
    FileContent(String),
    Stat(FileStat),
    /// Operation succeeded with nothing to report.
    Ack,
}

impl SyscallReply {
    pub fn into_process(self) -> KernelResult<ProcessSnapshot> {
        match self {
            SyscallReply::Process(snapshot) => Ok(snapshot),
            other => Err(other.mismatch()),
        }
    }

    pub fn into_process_list(self) -> KernelResult<BTreeMap<Pid, ProcessSnapshot>> {
        match self {
            SyscallReply::ProcessList(list) => Ok(list),
            other => Err(other.mismatch()),
        }
    }

    pub fn into_flag(self) -> KernelResult<bool> {
        match self {
            SyscallReply::Flag(flag) => Ok(flag),
            other => Err(other.mismatch()),
        }
    }

    pub fn into_wait(self) -> KernelResult<ck_protocol::WaitOutcome> {
        match self {
            SyscallReply::Wait(outcome) => Ok(outcome),
            other => Err(other.mismatch()),
        }
    }

    pub fn into_pipeline(self) -> KernelResult<PipelineReceipt> {
        match self {
            SyscallReply::Pipeline(receipt) => Ok(receipt),
            other => Err(other.mismatch()),
        }
    }

    pub fn into_dir_listing(self) -> KernelResult<ReadDirReply> {
        match self {
            SyscallReply::DirListing(listing) => Ok(listing),
            other => Err(other.mismatch()),
        }
    }

    pub fn into_file_content(self) -> KernelResult<String> {
        match self {
            SyscallReply::FileContent(content) => Ok(content),
            other => Err(other.mismatch()),
        }
    }

    pub fn into_stat(self) -> KernelResult<FileStat> {
        match self {
            SyscallReply::Stat(stat) => Ok(stat),
            other => Err(other.mismatch()),
        }
    }

    fn mismatch(&self) -> KernelError {
        KernelError::io_failure("syscall returned an unexpected reply shape")
    }
}
