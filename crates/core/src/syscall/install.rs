//! Registration of the built-in syscall table.

use std::sync::{Arc, Weak};

use ck_protocol::Signal;

use crate::errors::{KernelError, KernelResult};
use crate::kernel::Kernel;
use crate::pipeline::run_pipeline;
use crate::syscall::params::{SyscallParams, SyscallReply};

fn upgrade(weak: &Weak<Kernel>) -> KernelResult<Arc<Kernel>> {
    weak.upgrade()
        .ok_or_else(|| KernelError::io_failure("kernel is shut down"))
}

fn mismatch(name: &str) -> KernelError {
    KernelError::invalid_argument(format!("mismatched parameters for {name}"))
}

/// Installs every `proc.*` and `fs.*` handler on the kernel's gateway.
///
/// Handlers capture only a weak kernel reference: the gateway lives
/// inside the kernel, and a strong capture would keep the whole graph
/// alive forever.
pub fn install_syscalls(kernel: &Arc<Kernel>) {
    let gateway = kernel.gateway();

    let weak = Arc::downgrade(kernel);
    gateway.on("proc.spawn", move |params| {
        let weak = weak.clone();
        Box::pin(async move {
            let kernel = upgrade(&weak)?;
            let SyscallParams::ProcSpawn { spec, enqueue } = params else {
                return Err(mismatch("proc.spawn"));
            };
            let snapshot = kernel.processes().spawn(spec);
            if enqueue {
                kernel.scheduler().enqueue(snapshot.pid);
            }
            Ok(SyscallReply::Process(snapshot))
        })
    });

    let weak = Arc::downgrade(kernel);
    gateway.on("proc.pipeline", move |params| {
        let weak = weak.clone();
        Box::pin(async move {
            let kernel = upgrade(&weak)?;
            let SyscallParams::ProcPipeline(request) = params else {
                return Err(mismatch("proc.pipeline"));
            };
            let receipt = run_pipeline(&kernel, request).await?;
            Ok(SyscallReply::Pipeline(receipt))
        })
    });

    let weak = Arc::downgrade(kernel);
    gateway.on("proc.list", move |_params| {
        let weak = weak.clone();
        Box::pin(async move {
            let kernel = upgrade(&weak)?;
            Ok(SyscallReply::ProcessList(kernel.processes().list()))
        })
    });

    let weak = Arc::downgrade(kernel);
    gateway.on("proc.kill", move |params| {
        let weak = weak.clone();
        Box::pin(async move {
            let kernel = upgrade(&weak)?;
            let SyscallParams::ProcKill { pid } = params else {
                return Err(mismatch("proc.kill"));
            };
            Ok(SyscallReply::Flag(
                kernel.processes().kill(pid, Signal::Kill),
            ))
        })
    });

    let weak = Arc::downgrade(kernel);
    gateway.on("proc.wait", move |params| {
        let weak = weak.clone();
        Box::pin(async move {
            let kernel = upgrade(&weak)?;
            let SyscallParams::ProcWait { pid } = params else {
                return Err(mismatch("proc.wait"));
            };
            let outcome = kernel.processes().wait_for_exit(pid).await?;
            Ok(SyscallReply::Wait(outcome))
        })
    });

    let weak = Arc::downgrade(kernel);
    gateway.on("proc.sendSignal", move |params| {
        let weak = weak.clone();
        Box::pin(async move {
            let kernel = upgrade(&weak)?;
            let SyscallParams::ProcSendSignal { pid, signal } = params else {
                return Err(mismatch("proc.sendSignal"));
            };
            Ok(SyscallReply::Flag(
                kernel.processes().send_signal(pid, signal),
            ))
        })
    });

    let weak = Arc::downgrade(kernel);
    gateway.on("fs.readDir", move |params| {
        let weak = weak.clone();
        Box::pin(async move {
            let kernel = upgrade(&weak)?;
            let SyscallParams::FsReadDir { path, options } = params else {
                return Err(mismatch("fs.readDir"));
            };
            let listing = kernel.vfs().read_dir(&path, options).await?;
            Ok(SyscallReply::DirListing(listing))
        })
    });

    let weak = Arc::downgrade(kernel);
    gateway.on("fs.readFile", move |params| {
        let weak = weak.clone();
        Box::pin(async move {
            let kernel = upgrade(&weak)?;
            let SyscallParams::FsReadFile { path } = params else {
                return Err(mismatch("fs.readFile"));
            };
            let content = kernel.vfs().read_file(&path).await?;
            Ok(SyscallReply::FileContent(content))
        })
    });

    let weak = Arc::downgrade(kernel);
    gateway.on("fs.writeFile", move |params| {
        let weak = weak.clone();
        Box::pin(async move {
            let kernel = upgrade(&weak)?;
            let SyscallParams::FsWriteFile {
                path,
                content,
                append,
            } = params
            else {
                return Err(mismatch("fs.writeFile"));
            };
            kernel.vfs().write_file(&path, &content, append).await?;
            Ok(SyscallReply::Ack)
        })
    });

    let weak = Arc::downgrade(kernel);
    gateway.on("fs.makeDir", move |params| {
        let weak = weak.clone();
        Box::pin(async move {
            let kernel = upgrade(&weak)?;
            let SyscallParams::FsMakeDir {
                path,
                create_parents,
            } = params
            else {
                return Err(mismatch("fs.makeDir"));
            };
            kernel.vfs().make_dir(&path, create_parents).await?;
            Ok(SyscallReply::Ack)
        })
    });

    let weak = Arc::downgrade(kernel);
    gateway.on("fs.remove", move |params| {
        let weak = weak.clone();
        Box::pin(async move {
            let kernel = upgrade(&weak)?;
            let SyscallParams::FsRemove {
                path,
                force,
                recursive,
            } = params
            else {
                return Err(mismatch("fs.remove"));
            };
            kernel.vfs().remove(&path, force, recursive).await?;
            Ok(SyscallReply::Ack)
        })
    });

    let weak = Arc::downgrade(kernel);
    gateway.on("fs.move", move |params| {
        let weak = weak.clone();
        Box::pin(async move {
            let kernel = upgrade(&weak)?;
            let SyscallParams::FsMove {
                source,
                destination,
            } = params
            else {
                return Err(mismatch("fs.move"));
            };
            kernel.vfs().rename(&source, &destination).await?;
            Ok(SyscallReply::Ack)
        })
    });

    let weak = Arc::downgrade(kernel);
    gateway.on("fs.copy", move |params| {
        let weak = weak.clone();
        Box::pin(async move {
            let kernel = upgrade(&weak)?;
            let SyscallParams::FsCopy {
                source,
                destination,
                recursive,
            } = params
            else {
                return Err(mismatch("fs.copy"));
            };
            kernel.vfs().copy(&source, &destination, recursive).await?;
            Ok(SyscallReply::Ack)
        })
    });

    let weak = Arc::downgrade(kernel);
    gateway.on("fs.stat", move |params| {
        let weak = weak.clone();
        Box::pin(async move {
            let kernel = upgrade(&weak)?;
            let SyscallParams::FsStat { path } = params else {
                return Err(mismatch("fs.stat"));
            };
            let stat = kernel.vfs().stat(&path).await?;
            Ok(SyscallReply::Stat(stat))
        })
    });
}
