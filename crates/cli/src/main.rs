//! The `cokernel` binary: boot the kernel and run a line-at-a-time REPL.
//!
//! No line editing, history, or completion; a terminal frontend owning
//! those would drive the same [`Shell`] API.

use clap::Parser;
use ck_core::config::{load_config, KernelConfig};
use ck_core::kernel::Kernel;
use ck_core::pipeline::DisplayFn;
use ck_core::shell::{Shell, ShellOutcome};
use ck_core::vfs::{HttpVfs, MemVfs, VfsBackend};
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cokernel", version, about = "A cooperative kernel simulation shell")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "cokernel.toml")]
    config: PathBuf,

    /// Base URL of the filesystem service. Omitted: in-memory backend.
    #[arg(long)]
    server_url: Option<String>,

    /// Scheduler tick period in milliseconds.
    #[arg(long)]
    tick_ms: Option<u64>,
}

impl Args {
    fn into_config(self) -> color_eyre::Result<KernelConfig> {
        let mut config = load_config(&self.config)?;
        if let Some(url) = self.server_url {
            config.vfs.server_url = Some(url);
        }
        if let Some(tick_ms) = self.tick_ms {
            config.kernel.tick_ms = tick_ms;
        }
        Ok(config)
    }
}

fn prompt(shell: &Shell) {
    let who = format!("{}@cokernel", shell.user());
    print!("{}:{}$ ", who.green().bold(), shell.display_cwd().blue());
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Args::parse().into_config()?;
    let backend: Arc<dyn VfsBackend> = match &config.vfs.server_url {
        Some(url) => Arc::new(HttpVfs::new(url.clone())),
        None => Arc::new(MemVfs::new()),
    };

    let kernel = Kernel::new(config, backend);
    kernel.boot();

    // Pipeline output already carries its trailing newline when it has
    // one; error lines do not.
    let display: DisplayFn = Arc::new(|text: String| {
        if text.ends_with('\n') {
            print!("{text}");
        } else {
            println!("{text}");
        }
        let _ = std::io::stdout().flush();
    });
    let mut shell = Shell::new(Arc::clone(&kernel), display);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(&shell);
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if shell.run_line(&line).await == ShellOutcome::Exit {
            break;
        }
    }

    kernel.shutdown().await;
    Ok(())
}
