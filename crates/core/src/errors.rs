//! The kernel error taxonomy.
//!
//! Every fallible kernel operation resolves to one of these kinds. The
//! message is a complete single line, already carrying whatever prefix the
//! failing command or subsystem uses (`rm: cannot remove 'x': no such file
//! or directory`), so callers display it verbatim.

use thiserror::Error;

/// Classification of a [`KernelError`], independent of its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown pid, command, syscall or path.
    NotFound,
    /// Missing operand or malformed parameters.
    InvalidArgument,
    /// Path escapes the sandbox root.
    AccessDenied,
    /// Directory where a file was required.
    IsADirectory,
    /// File where a directory was required.
    NotADirectory,
    /// Generic underlying failure.
    IoFailure,
    /// Uncaught error inside process logic.
    ProcessCrashed,
}

/// A structured kernel failure: a kind plus a display-ready message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    AccessDenied(String),
    #[error("{0}")]
    IsADirectory(String),
    #[error("{0}")]
    NotADirectory(String),
    #[error("{0}")]
    IoFailure(String),
    #[error("{0}")]
    ProcessCrashed(String),
}

impl KernelError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        KernelError::NotFound(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        KernelError::InvalidArgument(msg.into())
    }

    pub fn access_denied(msg: impl Into<String>) -> Self {
        KernelError::AccessDenied(msg.into())
    }

    pub fn is_a_directory(msg: impl Into<String>) -> Self {
        KernelError::IsADirectory(msg.into())
    }

    pub fn not_a_directory(msg: impl Into<String>) -> Self {
        KernelError::NotADirectory(msg.into())
    }

    pub fn io_failure(msg: impl Into<String>) -> Self {
        KernelError::IoFailure(msg.into())
    }

    pub fn process_crashed(msg: impl Into<String>) -> Self {
        KernelError::ProcessCrashed(msg.into())
    }

    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            KernelError::NotFound(_) => ErrorKind::NotFound,
            KernelError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            KernelError::AccessDenied(_) => ErrorKind::AccessDenied,
            KernelError::IsADirectory(_) => ErrorKind::IsADirectory,
            KernelError::NotADirectory(_) => ErrorKind::NotADirectory,
            KernelError::IoFailure(_) => ErrorKind::IoFailure,
            KernelError::ProcessCrashed(_) => ErrorKind::ProcessCrashed,
        }
    }

    /// The display-ready message line.
    pub fn message(&self) -> &str {
        match self {
            KernelError::NotFound(m)
            | KernelError::InvalidArgument(m)
            | KernelError::AccessDenied(m)
            | KernelError::IsADirectory(m)
            | KernelError::NotADirectory(m)
            | KernelError::IoFailure(m)
            | KernelError::ProcessCrashed(m) => m,
        }
    }

    /// Rebuilds this error with a new message, preserving the kind.
    pub fn with_message(&self, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        match self.kind() {
            ErrorKind::NotFound => KernelError::NotFound(msg),
            ErrorKind::InvalidArgument => KernelError::InvalidArgument(msg),
            ErrorKind::AccessDenied => KernelError::AccessDenied(msg),
            ErrorKind::IsADirectory => KernelError::IsADirectory(msg),
            ErrorKind::NotADirectory => KernelError::NotADirectory(msg),
            ErrorKind::IoFailure => KernelError::IoFailure(msg),
            ErrorKind::ProcessCrashed => KernelError::ProcessCrashed(msg),
        }
    }
}

/// Type alias for Result with KernelError.
pub type KernelResult<T> = Result<T, KernelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_bare_message() {
        let err = KernelError::not_found("cat: no such file or directory");
        assert_eq!(err.to_string(), "cat: no such file or directory");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn with_message_preserves_kind() {
        let err = KernelError::is_a_directory("Is a directory");
        let rebuilt = err.with_message("cat: read.me: Is a directory");
        assert_eq!(rebuilt.kind(), ErrorKind::IsADirectory);
        assert_eq!(rebuilt.message(), "cat: read.me: Is a directory");
    }
}
