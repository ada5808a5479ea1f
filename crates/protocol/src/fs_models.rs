//! Filesystem syscall payloads.
//!
//! Directory listings come back in two shapes depending on the request
//! options: bare names (directories marked with a trailing slash) or full
//! entries with size and modification time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Options for `fs.readDir`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReadDirOptions {
    /// Include entries whose names start with a dot.
    #[serde(default)]
    pub show_hidden: bool,

    /// Return [`DirEntry`] objects instead of bare names.
    #[serde(default)]
    pub long_format: bool,
}

/// One directory entry in long format.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DirEntry {
    pub name: String,
    pub is_directory: bool,
    pub size: u64,
    pub mtime: DateTime<Utc>,
}

/// Reply of `fs.readDir`: entries in long format, otherwise sorted names
/// with directories suffixed `/`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ReadDirReply {
    Entries(Vec<DirEntry>),
    Names(Vec<String>),
}

impl ReadDirReply {
    /// Display names regardless of shape, for callers that only list.
    pub fn display_names(&self) -> Vec<String> {
        match self {
            ReadDirReply::Entries(entries) => {
                entries.iter().map(|e| e.name.clone()).collect()
            }
            ReadDirReply::Names(names) => names.clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ReadDirReply::Entries(entries) => entries.len(),
            ReadDirReply::Names(names) => names.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reply of `fs.stat`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileStat {
    pub is_directory: bool,
    pub size: u64,
    pub mtime: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_from_both_shapes() {
        let names = ReadDirReply::Names(vec!["a".to_string(), "b/".to_string()]);
        assert_eq!(names.display_names(), vec!["a", "b/"]);

        let entries = ReadDirReply::Entries(vec![DirEntry {
            name: "notes.txt".to_string(),
            is_directory: false,
            size: 12,
            mtime: Utc::now(),
        }]);
        assert_eq!(entries.display_names(), vec!["notes.txt"]);
        assert!(!entries.is_empty());
    }
}
