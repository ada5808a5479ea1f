//! Kernel-facing VFS adapter.

use ck_protocol::{FileStat, ReadDirOptions, ReadDirReply};
use std::sync::Arc;

use crate::errors::{KernelError, KernelResult};
use crate::vfs::{VfsBackend, VfsCode, VfsError};

/// Resolves `path` against `cwd` into a normalized absolute path.
///
/// Handles `.`, `..`, repeated and trailing slashes. The virtual root is
/// a hard ceiling: a path that climbs above it is refused.
///
/// # Errors
///
/// `AccessDenied` when `..` segments escape the root.
pub fn resolve_path(path: &str, cwd: &str) -> KernelResult<String> {
    let joined = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("{cwd}/{path}")
    };

    let mut stack: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if stack.pop().is_none() {
                    return Err(KernelError::access_denied("Access denied"));
                }
            }
            other => stack.push(other),
        }
    }

    if stack.is_empty() {
        Ok("/".to_string())
    } else {
        Ok(format!("/{}", stack.join("/")))
    }
}

fn into_kernel_error(err: VfsError) -> KernelError {
    let message = err.message;
    match err.code {
        VfsCode::Eacces => KernelError::access_denied(message),
        VfsCode::Einval => KernelError::invalid_argument(message),
        VfsCode::Eisdir => KernelError::is_a_directory(message),
        VfsCode::Enotdir => KernelError::not_a_directory(message),
        VfsCode::Enoent => KernelError::not_found(message),
        VfsCode::Eexist | VfsCode::Eio => KernelError::io_failure(message),
    }
}

/// The adapter every `fs.*` syscall handler calls into.
///
/// Paths are re-normalized here even when callers already resolved them,
/// so a stray relative path can never slip through to a backend.
pub struct VfsClient {
    backend: Arc<dyn VfsBackend>,
}

impl VfsClient {
    pub fn new(backend: Arc<dyn VfsBackend>) -> Self {
        VfsClient { backend }
    }

    pub async fn read_dir(
        &self,
        path: &str,
        options: ReadDirOptions,
    ) -> KernelResult<ReadDirReply> {
        let path = resolve_path(path, "/")?;
        self.backend
            .read_dir(&path, options)
            .await
            .map_err(into_kernel_error)
    }

    pub async fn read_file(&self, path: &str) -> KernelResult<String> {
        let path = resolve_path(path, "/")?;
        self.backend
            .read_file(&path)
            .await
            .map_err(into_kernel_error)
    }

    pub async fn write_file(&self, path: &str, content: &str, append: bool) -> KernelResult<()> {
        let path = resolve_path(path, "/")?;
        self.backend
            .write_file(&path, content, append)
            .await
            .map_err(into_kernel_error)
    }

    pub async fn make_dir(&self, path: &str, create_parents: bool) -> KernelResult<()> {
        let path = resolve_path(path, "/")?;
        self.backend
            .make_dir(&path, create_parents)
            .await
            .map_err(into_kernel_error)
    }

    pub async fn remove(&self, path: &str, force: bool, recursive: bool) -> KernelResult<()> {
        let path = resolve_path(path, "/")?;
        self.backend
            .remove(&path, force, recursive)
            .await
            .map_err(into_kernel_error)
    }

    pub async fn rename(&self, source: &str, destination: &str) -> KernelResult<()> {
        let source = resolve_path(source, "/")?;
        let destination = resolve_path(destination, "/")?;
        self.backend
            .rename(&source, &destination)
            .await
            .map_err(into_kernel_error)
    }

    pub async fn copy(
        &self,
        source: &str,
        destination: &str,
        recursive: bool,
    ) -> KernelResult<()> {
        let source = resolve_path(source, "/")?;
        let destination = resolve_path(destination, "/")?;
        self.backend
            .copy(&source, &destination, recursive)
            .await
            .map_err(into_kernel_error)
    }

    pub async fn stat(&self, path: &str) -> KernelResult<FileStat> {
        let path = resolve_path(path, "/")?;
        self.backend.stat(&path).await.map_err(into_kernel_error)
    }
}
