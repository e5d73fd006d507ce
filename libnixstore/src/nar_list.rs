// SPDX-FileCopyrightText: 2026 libnixstore contributors
// SPDX-License-Identifier: MIT

//! Recursive listings of store path contents in the `nix nar ls --json`
//! format.

use std::collections::BTreeMap;
use std::fs::{self, Metadata, ReadDir};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, IoErrorContext, Result};
use crate::store::StoreHandle;

fn is_false(b: &bool) -> bool {
    !b
}

#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
#[serde(tag = "type")]
pub enum NarEntry {
    #[serde(rename = "directory")]
    Directory { entries: BTreeMap<String, NarEntry> },
    #[serde(rename = "regular")]
    Regular {
        #[serde(
            rename = "narOffset",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        nar_offset: Option<u64>,
        size: u64,

        #[serde(default, skip_serializing_if = "is_false")]
        executable: bool,
    },
    #[serde(rename = "symlink")]
    Symlink { target: String },
}

#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct NarList {
    pub version: u16,
    pub root: NarEntry,
}

struct Frame {
    path: PathBuf,
    /// Name in the parent directory, `None` for the root.
    name: Option<String>,
    entries: BTreeMap<String, NarEntry>,
    dir: ReadDir,
}

impl Frame {
    fn open(path: PathBuf, name: Option<String>) -> Result<Frame> {
        let dir = fs::read_dir(&path)
            .io_context(format!("Failed to read directory {}", path.display()))?;
        Ok(Frame {
            path,
            name,
            entries: BTreeMap::new(),
            dir,
        })
    }
}

fn file_entry(metadata: &Metadata) -> NarEntry {
    NarEntry::Regular {
        size: metadata.len(),
        executable: metadata.permissions().mode() & 0o100 != 0,
        nar_offset: None,
    }
}

fn symlink_entry(path: &Path) -> Result<NarEntry> {
    let target =
        fs::read_link(path).io_context(format!("Failed to read symlink {}", path.display()))?;
    Ok(NarEntry::Symlink {
        target: target.to_string_lossy().into_owned(),
    })
}

fn metadata(path: &Path) -> Result<Metadata> {
    fs::symlink_metadata(path).io_context(format!("Failed to stat {}", path.display()))
}

/// The entry for a non-directory, or `None` for a directory.
fn leaf_entry(path: &Path, metadata: &Metadata) -> Result<Option<NarEntry>> {
    let file_type = metadata.file_type();
    if file_type.is_file() {
        Ok(Some(file_entry(metadata)))
    } else if file_type.is_symlink() {
        Ok(Some(symlink_entry(path)?))
    } else if file_type.is_dir() {
        Ok(None)
    } else {
        Err(Error::UnsupportedFileType(path.to_owned()))
    }
}

/// List the file tree at `path`.
pub fn list_path(path: &Path) -> Result<NarList> {
    if let Some(root) = leaf_entry(path, &metadata(path)?)? {
        return Ok(NarList { version: 1, root });
    }

    let mut stack = vec![Frame::open(path.to_owned(), None)?];
    loop {
        let Some(frame) = stack.last_mut() else {
            // unreachable: the root frame returns once it is exhausted
            return Err(Error::UnsupportedFileType(path.to_owned()));
        };
        match frame.dir.next() {
            Some(entry) => {
                let entry = entry
                    .io_context(format!("Failed to read directory {}", frame.path.display()))?;
                let entry_path = entry.path();
                let Ok(name) = entry.file_name().into_string() else {
                    return Err(Error::NonUtf8Name(entry_path));
                };
                match leaf_entry(&entry_path, &metadata(&entry_path)?)? {
                    Some(leaf) => {
                        frame.entries.insert(name, leaf);
                    }
                    None => stack.push(Frame::open(entry_path, Some(name))?),
                }
            }
            None => {
                let Some(done) = stack.pop() else {
                    continue;
                };
                let entry = NarEntry::Directory {
                    entries: done.entries,
                };
                match (stack.last_mut(), done.name) {
                    (Some(parent), Some(name)) => {
                        parent.entries.insert(name, entry);
                    }
                    _ => return Ok(NarList { version: 1, root: entry }),
                }
            }
        }
    }
}

impl StoreHandle {
    /// List the contents of a registered store path.
    pub fn get_nar_list(&self, path: &str) -> Result<NarList> {
        let store_path = self.valid_path(path)?;
        list_path(&self.real_path(&store_path))
    }
}
