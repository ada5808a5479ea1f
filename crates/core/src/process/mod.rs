//! Process records, the process table, waiters and signal delivery.
//!
//! This module provides:
//! - The process record and spawn specification
//! - The table owning every record, pid allocation and lifecycle
//! - The execution context handed to process logic

pub mod context;
pub mod record;
pub mod table;

pub use context::ProcessContext;
pub use record::{ProcessLogic, SignalHandler, SpawnSpec};
pub use table::ProcessTable;
