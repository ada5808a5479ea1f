//! Shared fixture for kernel integration tests: a booted kernel on the
//! in-memory VFS, a shell in front of it, and a captured display sink.

use ck_core::config::KernelConfig;
use ck_core::kernel::Kernel;
use ck_core::pipeline::DisplayFn;
use ck_core::shell::Shell;
use ck_core::vfs::MemVfs;
use std::sync::{Arc, Mutex};

pub struct TestRig {
    pub kernel: Arc<Kernel>,
    pub shell: Shell,
    output: Arc<Mutex<Vec<String>>>,
}

impl TestRig {
    /// A kernel with the default config, booted and ready for lines.
    pub fn boot() -> Self {
        let kernel = Kernel::new(KernelConfig::default(), Arc::new(MemVfs::new()));
        kernel.boot();

        let output = Arc::new(Mutex::new(Vec::new()));
        let writer = Arc::clone(&output);
        let display: DisplayFn = Arc::new(move |line| {
            writer.lock().unwrap_or_else(|e| e.into_inner()).push(line);
        });
        let shell = Shell::new(Arc::clone(&kernel), display);

        TestRig {
            kernel,
            shell,
            output,
        }
    }

    /// Runs one shell line to completion (or to launch, for `&`).
    #[allow(dead_code)]
    pub async fn run(&mut self, line: &str) {
        self.shell.run_line(line).await;
    }

    /// Everything the display callback has received so far.
    #[allow(dead_code)]
    pub fn output(&self) -> Vec<String> {
        self.output.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    #[allow(dead_code)]
    pub fn clear_output(&self) {
        self.output.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    #[allow(dead_code)]
    pub async fn halt(self) {
        self.kernel.shutdown().await;
    }
}
