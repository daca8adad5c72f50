//! File tree access scoped beneath a single root directory.
//!
//! Every path handed to [`ContentStore`] is relative to its root. Paths are
//! normalized lexically before they touch the filesystem: `.` segments are
//! dropped, `..` pops the previous segment, and anything that would climb
//! above the root (or an absolute path) is rejected with
//! [`ZibError::PathEscape`].

use crate::error::ZibError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

pub type StoreResult<T> = std::result::Result<T, ZibError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentEntry {
    /// Path relative to the listed directory.
    pub path: String,
    pub kind: EntryKind,
    pub extension: Option<String>,
}

impl ContentEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

/// Case-insensitive lexicographic order, ties broken by exact byte order.
pub fn listing_order(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn normalize_relative(path: &Path) -> StoreResult<PathBuf> {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(ZibError::PathEscape(path.display().to_string()));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ZibError::PathEscape(path.display().to_string()));
            }
        }
    }
    Ok(parts.into_iter().collect())
}

fn io_error(op: &'static str, path: &Path, err: std::io::Error) -> ZibError {
    if err.kind() == ErrorKind::NotFound {
        ZibError::NotFound(path.display().to_string())
    } else {
        ZibError::io(op, path, err)
    }
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves `path` to an absolute location beneath the root.
    pub fn absolute(&self, path: impl AsRef<Path>) -> StoreResult<PathBuf> {
        let relative = normalize_relative(path.as_ref())?;
        Ok(self.root.join(relative))
    }

    /// Returns a store rooted at `subpath` of this one.
    pub fn scoped(&self, subpath: impl AsRef<Path>) -> StoreResult<ContentStore> {
        Ok(ContentStore::new(self.absolute(subpath)?))
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.absolute(path).map(|p| p.exists()).unwrap_or(false)
    }

    /// Non-recursive listing in [`listing_order`]. Entries whose names are not
    /// valid UTF-8 are left out since they could never be addressed again.
    pub fn list(&self, subpath: impl AsRef<Path>) -> StoreResult<Vec<ContentEntry>> {
        let dir = self.absolute(subpath)?;
        let read_dir = fs::read_dir(&dir).map_err(|err| io_error("list", &dir, err))?;

        let mut out = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|err| ZibError::io("list", &dir, err))?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let file_type = entry
                .file_type()
                .map_err(|err| ZibError::io("stat", entry.path(), err))?;
            let kind = if file_type.is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::File
            };
            let extension = match kind {
                EntryKind::File => Path::new(&name)
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(ToOwned::to_owned),
                EntryKind::Dir => None,
            };
            out.push(ContentEntry {
                path: name,
                kind,
                extension,
            });
        }

        out.sort_by(|a, b| listing_order(&a.path, &b.path));
        Ok(out)
    }

    pub fn read(&self, path: impl AsRef<Path>) -> StoreResult<Vec<u8>> {
        let file = self.absolute(path)?;
        if file.is_dir() {
            return Err(ZibError::NotFound(file.display().to_string()));
        }
        fs::read(&file).map_err(|err| io_error("read", &file, err))
    }

    pub fn read_to_string(&self, path: impl AsRef<Path>) -> StoreResult<String> {
        let bytes = self.read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Writes `bytes`, creating missing parent directories.
    pub fn write(&self, path: impl AsRef<Path>, bytes: &[u8]) -> StoreResult<()> {
        let file = self.absolute(path)?;
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).map_err(|err| ZibError::io("create dir", parent, err))?;
        }
        fs::write(&file, bytes).map_err(|err| ZibError::io("write", &file, err))
    }

    pub fn delete(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let file = self.absolute(path)?;
        fs::remove_file(&file).map_err(|err| io_error("delete", &file, err))
    }

    /// Creates `path` and any missing parents. Fails when `path` already exists.
    pub fn create_dir(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let dir = self.absolute(path)?;
        if dir.exists() {
            return Err(ZibError::io(
                "create dir",
                &dir,
                std::io::Error::from(ErrorKind::AlreadyExists),
            ));
        }
        fs::create_dir_all(&dir).map_err(|err| ZibError::io("create dir", &dir, err))
    }

    /// Removes a directory and everything below it.
    pub fn delete_dir(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let dir = self.absolute(path)?;
        if dir == self.root {
            return Err(ZibError::PathEscape("refusing to delete the content root".to_string()));
        }
        fs::remove_dir_all(&dir).map_err(|err| io_error("delete dir", &dir, err))
    }

    /// Moves a file or directory subtree. The target must not exist.
    pub fn rename(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) -> StoreResult<()> {
        let source = self.absolute(from)?;
        let target = self.absolute(to)?;
        if source == target {
            return Ok(());
        }
        if !source.exists() {
            return Err(ZibError::NotFound(source.display().to_string()));
        }
        if target.exists() {
            return Err(ZibError::io(
                "rename",
                &target,
                std::io::Error::from(ErrorKind::AlreadyExists),
            ));
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|err| ZibError::io("create dir", parent, err))?;
        }
        fs::rename(&source, &target).map_err(|err| ZibError::io("rename", &source, err))
    }

    /// Last modification time as recorded by the filesystem.
    pub fn timestamp(&self, path: impl AsRef<Path>) -> StoreResult<DateTime<Utc>> {
        let file = self.absolute(path)?;
        let meta = fs::metadata(&file).map_err(|err| io_error("stat", &file, err))?;
        let modified = meta
            .modified()
            .map_err(|err| ZibError::io("stat", &file, err))?;
        Ok(DateTime::<Utc>::from(modified))
    }
}
