//! Kernel configuration loading.
//!
//! Configuration lives in a single TOML file with three small tables:
//!
//! ```toml
//! [kernel]
//! tick_ms = 50
//! dmesg_capacity = 1000
//!
//! [vfs]
//! server_url = "http://localhost:3000/api"
//!
//! [shell]
//! user = "user"
//! home = "/"
//! ```
//!
//! A missing file yields the defaults; a present but malformed file is an
//! error. Command-line flags override loaded values at the binary layer.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file at {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML file at {path}: {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Type alias for Result with ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Scheduler and logging settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct KernelSection {
    /// Milliseconds between scheduler ticks.
    pub tick_ms: u64,

    /// Maximum retained dmesg records before the oldest are dropped.
    pub dmesg_capacity: usize,
}

impl Default for KernelSection {
    fn default() -> Self {
        KernelSection {
            tick_ms: 50,
            dmesg_capacity: 1000,
        }
    }
}

/// Filesystem backend settings.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct VfsSection {
    /// Base URL of the filesystem service. None selects the in-memory
    /// backend.
    pub server_url: Option<String>,
}

/// Shell environment defaults.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ShellSection {
    pub user: String,
    pub home: String,
}

impl Default for ShellSection {
    fn default() -> Self {
        ShellSection {
            user: "user".to_string(),
            home: "/".to_string(),
        }
    }
}

/// Complete kernel configuration.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct KernelConfig {
    pub kernel: KernelSection,
    pub vfs: VfsSection,
    pub shell: ShellSection,
}

/// Loads configuration from `path`.
///
/// # Arguments
///
/// * `path` - Location of the TOML file
///
/// # Returns
///
/// The parsed configuration, or the defaults if the file does not exist.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> ConfigResult<KernelConfig> {
    if !path.exists() {
        return Ok(KernelConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let config: KernelConfig =
        toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Path::new("/nonexistent/cokernel.toml")).unwrap();
        assert_eq!(config, KernelConfig::default());
        assert_eq!(config.kernel.tick_ms, 50);
        assert_eq!(config.kernel.dmesg_capacity, 1000);
        assert!(config.vfs.server_url.is_none());
        assert_eq!(config.shell.user, "user");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cokernel.toml");
        std::fs::write(
            &path,
            "[kernel]\ntick_ms = 10\n\n[vfs]\nserver_url = \"http://localhost:3000/api\"\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.kernel.tick_ms, 10);
        assert_eq!(config.kernel.dmesg_capacity, 1000);
        assert_eq!(
            config.vfs.server_url.as_deref(),
            Some("http://localhost:3000/api")
        );
        assert_eq!(config.shell.home, "/");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cokernel.toml");
        std::fs::write(&path, "[kernel\ntick_ms = ").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse { .. }));
    }
}
