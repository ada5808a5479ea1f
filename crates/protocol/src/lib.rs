//! # ck-protocol
//!
//! Core protocol definitions and data models for cokernel.
//!
//! This crate defines all shared data structures used for:
//! - Runtime process state (snapshots, statuses, wait outcomes)
//! - Signal numbering and naming
//! - Pipeline stage descriptors, receipts and background jobs
//! - Filesystem syscall payloads (directory entries, stats, options)
//!
//! ## Modules
//!
//! - [`process_models`]: Process snapshots, statuses and wait outcomes
//! - [`signal`]: Signal numbers, names and exit-code conventions
//! - [`pipeline_models`]: Stage descriptors, sinks, receipts and jobs
//! - [`fs_models`]: Directory listings, file stats and options
//!
//! ## Design Principles
//!
//! - Minimal dependencies: only serde and chrono
//! - Wire compatibility: field names match the syscall surface
//!   (camelCase keys, lowercase status strings, numeric signals)
//! - Independent compilation: no dependencies on other cokernel crates

pub mod fs_models;
pub mod pipeline_models;
pub mod process_models;
pub mod signal;

// Re-export all public types for convenience
pub use fs_models::*;
pub use pipeline_models::*;
pub use process_models::*;
pub use signal::*;
