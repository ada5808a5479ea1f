//! # ck-core
//!
//! Cooperative kernel simulation for cokernel.
//!
//! This crate provides:
//! - A process table with lifecycle tracking, waiters and signal delivery
//! - A cooperative round-robin scheduler advancing one slice per tick
//! - A syscall gateway routing `proc.*` and `fs.*` calls
//! - Pipeline orchestration with stdin/stdout handoff and jobs
//! - A virtual filesystem client with HTTP and in-memory backends
//! - The command set and the shell that drives it
//!
//! ## Modules
//!
//! - [`kernel`]: The facade owning every subsystem
//! - [`process`]: Process records, table, waiters and signals
//! - [`scheduler`]: Run queue and tick driver
//! - [`syscall`]: Gateway, typed params and handler installation
//! - [`pipeline`]: Stage wiring and foreground/background drivers
//! - [`jobs`]: Background job table
//! - [`vfs`]: Backend trait, HTTP client, in-memory double, path adapter
//! - [`commands`]: Command trait, registry and implementations
//! - [`shell`]: Line parsing, environment and builtins
//! - [`task`]: The resumable task abstraction processes run as
//! - [`config`]: TOML configuration loading
//! - [`dmesg`]: Bounded kernel log ring
//! - [`errors`]: The kernel error taxonomy

pub mod commands;
pub mod config;
pub mod dmesg;
pub mod errors;
pub mod jobs;
pub mod kernel;
pub mod pipeline;
pub mod process;
pub mod scheduler;
pub mod shell;
pub mod syscall;
pub mod task;
pub mod vfs;
