//! The syscall gateway and its typed request/reply surface.
//!
//! Every capability the kernel offers, from spawning processes to touching
//! the virtual filesystem, is reached by emitting a [`SyscallParams`] value
//! through the [`SyscallGateway`]. Handlers are registered by name at boot;
//! process logic and the shell both go through the same table.

pub mod gateway;
pub mod install;
pub mod params;

pub use gateway::{SyscallGateway, SyscallHandler};
pub use install::install_syscalls;
pub use params::{SyscallParams, SyscallReply};
