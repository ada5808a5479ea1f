//! In-memory VFS backend.
//!
//! A behavioral double of the HTTP filesystem service: same listing
//! shapes, same error codes, same quirks (removal is always recursive,
//! renaming onto an existing directory moves the source inside it). Used
//! by the test suite and by standalone runs without a server.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ck_protocol::{DirEntry, FileStat, ReadDirOptions, ReadDirReply};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::vfs::{VfsBackend, VfsCode, VfsError, VfsResult};

#[derive(Debug, Clone)]
enum Node {
    File {
        content: String,
        mtime: DateTime<Utc>,
    },
    Dir {
        children: BTreeMap<String, Node>,
        mtime: DateTime<Utc>,
    },
}

impl Node {
    fn dir() -> Node {
        Node::Dir {
            children: BTreeMap::new(),
            mtime: Utc::now(),
        }
    }

    fn file(content: &str) -> Node {
        Node::File {
            content: content.to_string(),
            mtime: Utc::now(),
        }
    }

    fn is_dir(&self) -> bool {
        matches!(self, Node::Dir { .. })
    }

    fn size(&self) -> u64 {
        match self {
            Node::File { content, .. } => content.len() as u64,
            Node::Dir { .. } => 0,
        }
    }

    fn mtime(&self) -> DateTime<Utc> {
        match self {
            Node::File { mtime, .. } | Node::Dir { mtime, .. } => *mtime,
        }
    }
}

/// The in-memory tree. All operations take the single lock briefly and
/// never hold it across an await.
pub struct MemVfs {
    root: Mutex<Node>,
}

impl MemVfs {
    pub fn new() -> Self {
        MemVfs {
            root: Mutex::new(Node::dir()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Node> {
        match self.root.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for MemVfs {
    fn default() -> Self {
        MemVfs::new()
    }
}

fn missing() -> VfsError {
    VfsError::enoent("No such file or directory")
}

fn segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits a path into parent segments and the final name. The root has
/// no name and cannot be the target of create/remove/rename ops.
fn split_target(path: &str) -> VfsResult<(Vec<String>, String)> {
    let mut segs = segments(path);
    match segs.pop() {
        Some(name) => Ok((segs, name)),
        None => Err(VfsError::einval("Invalid argument")),
    }
}

fn find<'a>(root: &'a Node, segs: &[String]) -> Option<&'a Node> {
    let mut node = root;
    for seg in segs {
        match node {
            Node::Dir { children, .. } => node = children.get(seg)?,
            Node::File { .. } => return None,
        }
    }
    Some(node)
}

/// Walks to the directory at `segs`, yielding its child map.
fn find_dir_mut<'a>(
    root: &'a mut Node,
    segs: &[String],
) -> VfsResult<&'a mut BTreeMap<String, Node>> {
    let mut node = root;
    for seg in segs {
        let Node::Dir { children, .. } = node else {
            return Err(VfsError::enotdir("Not a directory"));
        };
        node = children.get_mut(seg).ok_or_else(missing)?;
    }
    match node {
        Node::Dir { children, .. } => Ok(children),
        Node::File { .. } => Err(VfsError::enotdir("Not a directory")),
    }
}

/// Directory destinations receive the source's basename, like `rename`
/// against the real service.
fn destination_target(
    root: &Node,
    destination: &str,
    source_name: &str,
) -> VfsResult<(Vec<String>, String)> {
    let dst_segs = segments(destination);
    let dst_is_dir = find(root, &dst_segs).map(Node::is_dir).unwrap_or(false);
    if dst_is_dir {
        Ok((dst_segs, source_name.to_string()))
    } else {
        split_target(destination)
    }
}

#[async_trait]
impl VfsBackend for MemVfs {
    async fn read_dir(&self, path: &str, options: ReadDirOptions) -> VfsResult<ReadDirReply> {
        let guard = self.lock();
        let node = find(&guard, &segments(path)).ok_or_else(missing)?;
        let Node::Dir { children, .. } = node else {
            return Err(VfsError::enotdir("Not a directory"));
        };

        let visible = children
            .iter()
            .filter(|(name, _)| options.show_hidden || !name.starts_with('.'));
        if options.long_format {
            let entries = visible
                .map(|(name, child)| DirEntry {
                    name: name.clone(),
                    is_directory: child.is_dir(),
                    size: child.size(),
                    mtime: child.mtime(),
                })
                .collect();
            Ok(ReadDirReply::Entries(entries))
        } else {
            let names = visible
                .map(|(name, child)| {
                    if child.is_dir() {
                        format!("{name}/")
                    } else {
                        name.clone()
                    }
                })
                .collect();
            Ok(ReadDirReply::Names(names))
        }
    }

    async fn read_file(&self, path: &str) -> VfsResult<String> {
        let guard = self.lock();
        match find(&guard, &segments(path)) {
            Some(Node::File { content, .. }) => Ok(content.clone()),
            Some(Node::Dir { .. }) => Err(VfsError::eisdir("Is a directory")),
            None => Err(missing()),
        }
    }

    async fn write_file(&self, path: &str, content: &str, append: bool) -> VfsResult<()> {
        let (parent, name) = split_target(path)?;
        let mut guard = self.lock();
        let children = find_dir_mut(&mut guard, &parent)?;
        match children.get_mut(&name) {
            Some(Node::Dir { .. }) => Err(VfsError::eisdir("Is a directory")),
            Some(Node::File {
                content: existing,
                mtime,
            }) => {
                if append {
                    existing.push_str(content);
                } else {
                    *existing = content.to_string();
                }
                *mtime = Utc::now();
                Ok(())
            }
            None => {
                children.insert(name, Node::file(content));
                Ok(())
            }
        }
    }

    async fn make_dir(&self, path: &str, create_parents: bool) -> VfsResult<()> {
        let segs = segments(path);
        let mut guard = self.lock();

        if create_parents {
            let mut node = &mut *guard;
            for seg in &segs {
                let Node::Dir { children, .. } = node else {
                    return Err(VfsError::enotdir("Not a directory"));
                };
                node = children.entry(seg.clone()).or_insert_with(Node::dir);
            }
            if node.is_dir() {
                Ok(())
            } else {
                Err(VfsError::eexist("File exists"))
            }
        } else {
            let (parent, name) = split_target(path)?;
            let children = find_dir_mut(&mut guard, &parent)?;
            if children.contains_key(&name) {
                return Err(VfsError::eexist("File exists"));
            }
            children.insert(name, Node::dir());
            Ok(())
        }
    }

    async fn remove(&self, path: &str, force: bool, _recursive: bool) -> VfsResult<()> {
        let (parent, name) = split_target(path)?;
        let mut guard = self.lock();
        match find_dir_mut(&mut guard, &parent) {
            Ok(children) => match children.remove(&name) {
                Some(_) => Ok(()),
                None if force => Ok(()),
                None => Err(missing()),
            },
            Err(err) if force && err.code == VfsCode::Enoent => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn rename(&self, source: &str, destination: &str) -> VfsResult<()> {
        let (src_parent, src_name) = split_target(source)?;
        let mut guard = self.lock();
        let (dst_parent, dst_name) = destination_target(&guard, destination, &src_name)?;

        let node = find_dir_mut(&mut guard, &src_parent)?
            .remove(&src_name)
            .ok_or_else(missing)?;
        match find_dir_mut(&mut guard, &dst_parent) {
            Ok(children) => {
                children.insert(dst_name, node);
                Ok(())
            }
            Err(err) => {
                // put the source back so a failed rename loses nothing
                if let Ok(children) = find_dir_mut(&mut guard, &src_parent) {
                    children.insert(src_name, node);
                }
                Err(err)
            }
        }
    }

    async fn copy(&self, source: &str, destination: &str, recursive: bool) -> VfsResult<()> {
        let (_, src_name) = split_target(source)?;
        let mut guard = self.lock();
        let node = find(&guard, &segments(source))
            .ok_or_else(missing)?
            .clone();
        if node.is_dir() && !recursive {
            return Err(VfsError::eisdir("-r not specified"));
        }

        let (dst_parent, dst_name) = destination_target(&guard, destination, &src_name)?;
        let children = find_dir_mut(&mut guard, &dst_parent)?;
        children.insert(dst_name, node);
        Ok(())
    }

    async fn stat(&self, path: &str) -> VfsResult<FileStat> {
        let guard = self.lock();
        let node = find(&guard, &segments(path)).ok_or_else(missing)?;
        Ok(FileStat {
            is_directory: node.is_dir(),
            size: node.size(),
            mtime: node.mtime(),
        })
    }
}
