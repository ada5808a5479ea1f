//! Virtual filesystem adapter and backends.
//!
//! The kernel never touches storage directly. All file operations go
//! through [`VfsClient`], which normalizes paths against the caller's
//! working directory, forwards to a [`VfsBackend`] and maps wire errors
//! into kernel errors. Two backends exist: [`HttpVfs`] speaking to the
//! filesystem service over HTTP, and [`MemVfs`], an in-memory double of
//! the same service for tests and standalone runs.

pub mod client;
pub mod http;
pub mod mem;

pub use client::{resolve_path, VfsClient};
pub use http::HttpVfs;
pub use mem::MemVfs;

use async_trait::async_trait;
use ck_protocol::{FileStat, ReadDirOptions, ReadDirReply};
use thiserror::Error;

/// POSIX-style error codes carried on the VFS wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VfsCode {
    Eacces,
    Einval,
    Eisdir,
    Eio,
    Enotdir,
    Enoent,
    Eexist,
}

impl VfsCode {
    pub fn as_str(self) -> &'static str {
        match self {
            VfsCode::Eacces => "EACCES",
            VfsCode::Einval => "EINVAL",
            VfsCode::Eisdir => "EISDIR",
            VfsCode::Eio => "EIO",
            VfsCode::Enotdir => "ENOTDIR",
            VfsCode::Enoent => "ENOENT",
            VfsCode::Eexist => "EEXIST",
        }
    }

    /// Parses a wire code, falling back to `EIO` for anything unknown.
    pub fn parse(code: &str) -> VfsCode {
        match code {
            "EACCES" => VfsCode::Eacces,
            "EINVAL" => VfsCode::Einval,
            "EISDIR" => VfsCode::Eisdir,
            "ENOTDIR" => VfsCode::Enotdir,
            "ENOENT" => VfsCode::Enoent,
            "EEXIST" => VfsCode::Eexist,
            _ => VfsCode::Eio,
        }
    }
}

/// A failed VFS operation: the wire `{error, code}` body as a typed error.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct VfsError {
    pub code: VfsCode,
    pub message: String,
}

impl VfsError {
    pub fn new(code: VfsCode, message: impl Into<String>) -> Self {
        VfsError {
            code,
            message: message.into(),
        }
    }

    pub fn enoent(message: impl Into<String>) -> Self {
        VfsError::new(VfsCode::Enoent, message)
    }

    pub fn eisdir(message: impl Into<String>) -> Self {
        VfsError::new(VfsCode::Eisdir, message)
    }

    pub fn enotdir(message: impl Into<String>) -> Self {
        VfsError::new(VfsCode::Enotdir, message)
    }

    pub fn eexist(message: impl Into<String>) -> Self {
        VfsError::new(VfsCode::Eexist, message)
    }

    pub fn einval(message: impl Into<String>) -> Self {
        VfsError::new(VfsCode::Einval, message)
    }

    pub fn eacces(message: impl Into<String>) -> Self {
        VfsError::new(VfsCode::Eacces, message)
    }

    pub fn eio(message: impl Into<String>) -> Self {
        VfsError::new(VfsCode::Eio, message)
    }
}

pub type VfsResult<T> = Result<T, VfsError>;

/// Storage operations a VFS backend must provide.
///
/// Paths are normalized absolute paths within the virtual root. Removal
/// is always recursive on the storage side; `recursive` is carried for
/// the wire only.
#[async_trait]
pub trait VfsBackend: Send + Sync {
    async fn read_dir(&self, path: &str, options: ReadDirOptions) -> VfsResult<ReadDirReply>;

    async fn read_file(&self, path: &str) -> VfsResult<String>;

    async fn write_file(&self, path: &str, content: &str, append: bool) -> VfsResult<()>;

    async fn make_dir(&self, path: &str, create_parents: bool) -> VfsResult<()>;

    async fn remove(&self, path: &str, force: bool, recursive: bool) -> VfsResult<()>;

    async fn rename(&self, source: &str, destination: &str) -> VfsResult<()>;

    async fn copy(&self, source: &str, destination: &str, recursive: bool) -> VfsResult<()>;

    async fn stat(&self, path: &str) -> VfsResult<FileStat>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_wire_codes_fall_back_to_eio() {
        assert_eq!(VfsCode::parse("ENOENT"), VfsCode::Enoent);
        assert_eq!(VfsCode::parse("EWHATEVER"), VfsCode::Eio);
        assert_eq!(VfsCode::parse(""), VfsCode::Eio);
    }

    #[test]
    fn error_displays_its_message_only() {
        let err = VfsError::enoent("No such file or directory");
        assert_eq!(err.to_string(), "No such file or directory");
        assert_eq!(err.code.as_str(), "ENOENT");
    }
}
