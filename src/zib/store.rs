//! Structured records (books, fragments, references) behind [`RecordStore`].
//!
//! [`JsonStore`] keeps everything in one pretty-printed JSON file under the
//! state directory. Each call is its own read-modify-write cycle, serialized
//! across processes by an advisory lock on a sibling `.lock` file, and the file
//! is replaced atomically. [`MemoryStore`] holds the same data in process.

use crate::error::ZibError;
use crate::zib::model::{Book, Fragment, NewFragment, Reference};
use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait RecordStore {
    fn books(&self) -> Result<Vec<Book>>;
    fn find_book(&self, id: u64) -> Result<Option<Book>>;
    fn find_book_by_dir(&self, dir: &str) -> Result<Option<Book>>;
    fn insert_book(&self, title: &str, dir: &str) -> Result<Book>;
    fn save_book(&self, book: &Book) -> Result<()>;
    fn delete_book(&self, id: u64) -> Result<bool>;

    /// Fragments of a book in ascending position order.
    fn fragments(&self, book_id: u64) -> Result<Vec<Fragment>>;
    fn find_fragment_by_filename(&self, book_id: u64, full_filename: &str)
    -> Result<Option<Fragment>>;
    fn insert_fragment(&self, fragment: NewFragment) -> Result<Fragment>;
    fn save_fragment(&self, fragment: &Fragment) -> Result<()>;
    /// Deletes the book's fragments whose filename is not in `keep` and
    /// returns them. Other books are never touched.
    fn delete_fragments_not_in(&self, book_id: u64, keep: &BTreeSet<String>)
    -> Result<Vec<Fragment>>;
    fn delete_fragments_for_book(&self, book_id: u64) -> Result<usize>;

    /// References of a book, oldest first.
    fn references(&self, book_id: u64) -> Result<Vec<Reference>>;
    fn find_reference(&self, id: u64) -> Result<Option<Reference>>;
    fn insert_reference(
        &self,
        book_id: u64,
        html_url: &str,
        created_at_epoch_secs: u64,
    ) -> Result<Reference>;
    fn delete_references_for_book(&self, book_id: u64) -> Result<usize>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreData {
    pub schema_version: u32,
    pub next_book_id: u64,
    pub next_fragment_id: u64,
    pub next_reference_id: u64,
    pub books: Vec<Book>,
    pub fragments: Vec<Fragment>,
    pub references: Vec<Reference>,
}

impl Default for StoreData {
    fn default() -> Self {
        Self {
            schema_version: 1,
            next_book_id: 1,
            next_fragment_id: 1,
            next_reference_id: 1,
            books: Vec::new(),
            fragments: Vec::new(),
            references: Vec::new(),
        }
    }
}

impl StoreData {
    fn check_fragment_unique(&self, candidate: &Fragment) -> Result<()> {
        for existing in self
            .fragments
            .iter()
            .filter(|f| f.book_id == candidate.book_id && f.id != candidate.id)
        {
            if existing.full_filename == candidate.full_filename {
                return Err(ZibError::Validation(format!(
                    "fragment file `{}` already indexed for book {}",
                    candidate.full_filename, candidate.book_id
                ))
                .into());
            }
            if existing.position == candidate.position {
                return Err(ZibError::Validation(format!(
                    "position {} already used by `{}` in book {}",
                    candidate.position, existing.full_filename, candidate.book_id
                ))
                .into());
            }
        }
        Ok(())
    }

    fn books(&self) -> Vec<Book> {
        let mut out = self.books.clone();
        out.sort_by_key(|b| b.id);
        out
    }

    fn find_book(&self, id: u64) -> Option<Book> {
        self.books.iter().find(|b| b.id == id).cloned()
    }

    fn find_book_by_dir(&self, dir: &str) -> Option<Book> {
        self.books.iter().find(|b| b.dir == dir).cloned()
    }

    fn check_dir_free(&self, dir: &str, book_id: u64) -> Result<()> {
        if let Some(owner) = self.books.iter().find(|b| b.dir == dir && b.id != book_id) {
            return Err(ZibError::Validation(format!(
                "directory `{dir}` already belongs to book {}",
                owner.id
            ))
            .into());
        }
        Ok(())
    }

    fn insert_book(&mut self, title: &str, dir: &str) -> Result<Book> {
        self.check_dir_free(dir, self.next_book_id)?;
        let book = Book {
            id: self.next_book_id,
            title: title.to_string(),
            dir: dir.to_string(),
        };
        self.next_book_id += 1;
        self.books.push(book.clone());
        Ok(book)
    }

    fn save_book(&mut self, book: &Book) -> Result<()> {
        self.check_dir_free(&book.dir, book.id)?;
        let Some(slot) = self.books.iter_mut().find(|b| b.id == book.id) else {
            return Err(ZibError::NotFound(format!("book {}", book.id)).into());
        };
        *slot = book.clone();
        Ok(())
    }

    fn delete_book(&mut self, id: u64) -> bool {
        let before = self.books.len();
        self.books.retain(|b| b.id != id);
        self.books.len() != before
    }

    fn fragments(&self, book_id: u64) -> Vec<Fragment> {
        let mut out = self
            .fragments
            .iter()
            .filter(|f| f.book_id == book_id)
            .cloned()
            .collect::<Vec<_>>();
        out.sort_by_key(|f| (f.position, f.id));
        out
    }

    fn find_fragment_by_filename(&self, book_id: u64, full_filename: &str) -> Option<Fragment> {
        self.fragments
            .iter()
            .find(|f| f.book_id == book_id && f.full_filename == full_filename)
            .cloned()
    }

    fn insert_fragment(&mut self, new: NewFragment) -> Result<Fragment> {
        let fragment = Fragment {
            id: self.next_fragment_id,
            book_id: new.book_id,
            position: new.position,
            full_filename: new.full_filename,
            menu_label: new.menu_label,
            kind: new.kind,
            child: new.child,
            reference_id: new.reference_id,
        };
        self.check_fragment_unique(&fragment)?;
        self.next_fragment_id += 1;
        self.fragments.push(fragment.clone());
        Ok(fragment)
    }

    fn save_fragment(&mut self, fragment: &Fragment) -> Result<()> {
        self.check_fragment_unique(fragment)?;
        let Some(slot) = self
            .fragments
            .iter_mut()
            .find(|f| f.id == fragment.id && f.book_id == fragment.book_id)
        else {
            return Err(ZibError::NotFound(format!("fragment {}", fragment.id)).into());
        };
        *slot = fragment.clone();
        Ok(())
    }

    fn delete_fragments_not_in(&mut self, book_id: u64, keep: &BTreeSet<String>) -> Vec<Fragment> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.fragments)
            .into_iter()
            .partition(|f| f.book_id == book_id && !keep.contains(&f.full_filename));
        self.fragments = kept;
        removed
    }

    fn delete_fragments_for_book(&mut self, book_id: u64) -> usize {
        let before = self.fragments.len();
        self.fragments.retain(|f| f.book_id != book_id);
        before - self.fragments.len()
    }

    fn references(&self, book_id: u64) -> Vec<Reference> {
        let mut out = self
            .references
            .iter()
            .filter(|r| r.book_id == book_id)
            .cloned()
            .collect::<Vec<_>>();
        out.sort_by_key(|r| (r.created_at_epoch_secs, r.id));
        out
    }

    fn find_reference(&self, id: u64) -> Option<Reference> {
        self.references.iter().find(|r| r.id == id).cloned()
    }

    fn insert_reference(&mut self, book_id: u64, html_url: &str, created: u64) -> Reference {
        let reference = Reference {
            id: self.next_reference_id,
            book_id,
            created_at_epoch_secs: created,
            html_url: html_url.to_string(),
        };
        self.next_reference_id += 1;
        self.references.push(reference.clone());
        reference
    }

    fn delete_references_for_book(&mut self, book_id: u64) -> usize {
        let before = self.references.len();
        self.references.retain(|r| r.book_id != book_id);
        before - self.references.len()
    }
}

/// Read and update access to [`StoreData`]; every [`RecordStore`] method is
/// one call to either.
pub trait DataAccess {
    fn read<T>(&self, f: impl FnOnce(&StoreData) -> T) -> Result<T>;
    fn update<T>(&self, f: impl FnOnce(&mut StoreData) -> Result<T>) -> Result<T>;
}

impl<S: DataAccess> RecordStore for S {
    fn books(&self) -> Result<Vec<Book>> {
        self.read(|d| d.books())
    }

    fn find_book(&self, id: u64) -> Result<Option<Book>> {
        self.read(|d| d.find_book(id))
    }

    fn find_book_by_dir(&self, dir: &str) -> Result<Option<Book>> {
        self.read(|d| d.find_book_by_dir(dir))
    }

    fn insert_book(&self, title: &str, dir: &str) -> Result<Book> {
        self.update(|d| d.insert_book(title, dir))
    }

    fn save_book(&self, book: &Book) -> Result<()> {
        self.update(|d| d.save_book(book))
    }

    fn delete_book(&self, id: u64) -> Result<bool> {
        self.update(|d| Ok(d.delete_book(id)))
    }

    fn fragments(&self, book_id: u64) -> Result<Vec<Fragment>> {
        self.read(|d| d.fragments(book_id))
    }

    fn find_fragment_by_filename(
        &self,
        book_id: u64,
        full_filename: &str,
    ) -> Result<Option<Fragment>> {
        self.read(|d| d.find_fragment_by_filename(book_id, full_filename))
    }

    fn insert_fragment(&self, fragment: NewFragment) -> Result<Fragment> {
        self.update(|d| d.insert_fragment(fragment))
    }

    fn save_fragment(&self, fragment: &Fragment) -> Result<()> {
        self.update(|d| d.save_fragment(fragment))
    }

    fn delete_fragments_not_in(
        &self,
        book_id: u64,
        keep: &BTreeSet<String>,
    ) -> Result<Vec<Fragment>> {
        self.update(|d| Ok(d.delete_fragments_not_in(book_id, keep)))
    }

    fn delete_fragments_for_book(&self, book_id: u64) -> Result<usize> {
        self.update(|d| Ok(d.delete_fragments_for_book(book_id)))
    }

    fn references(&self, book_id: u64) -> Result<Vec<Reference>> {
        self.read(|d| d.references(book_id))
    }

    fn find_reference(&self, id: u64) -> Result<Option<Reference>> {
        self.read(|d| d.find_reference(id))
    }

    fn insert_reference(
        &self,
        book_id: u64,
        html_url: &str,
        created_at_epoch_secs: u64,
    ) -> Result<Reference> {
        self.update(|d| Ok(d.insert_reference(book_id, html_url, created_at_epoch_secs)))
    }

    fn delete_references_for_book(&self, book_id: u64) -> Result<usize> {
        self.update(|d| Ok(d.delete_references_for_book(book_id)))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DataAccess for MemoryStore {
    fn read<T>(&self, f: impl FnOnce(&StoreData) -> T) -> Result<T> {
        let data = self
            .data
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store mutex poisoned"))?;
        Ok(f(&data))
    }

    fn update<T>(&self, f: impl FnOnce(&mut StoreData) -> Result<T>) -> Result<T> {
        let mut data = self
            .data
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store mutex poisoned"))?;
        let mut next = data.clone();
        let out = f(&mut next)?;
        *data = next;
        Ok(out)
    }
}

#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "store.json".into());
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn open_lock(&self) -> Result<fs::File> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("failed to open {}", lock_path.display()))
    }

    fn load(&self) -> Result<StoreData> {
        if !self.path.exists() {
            return Ok(StoreData::default());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(StoreData::default());
        }
        let parsed: StoreData = serde_json::from_str(&raw).map_err(|err| {
            ZibError::StoreCorrupt(format!("{}: {err}", self.path.display()))
        })?;
        Ok(parsed)
    }

    fn save(&self, data: &StoreData) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;

        let encoded = serde_json::to_string_pretty(data)?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
        tmp.write_all(encoded.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|err| err.error)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

impl DataAccess for JsonStore {
    fn read<T>(&self, f: impl FnOnce(&StoreData) -> T) -> Result<T> {
        let lock = self.open_lock()?;
        FileExt::lock_shared(&lock)
            .map_err(|err| ZibError::Locked(format!("{}: {err}", self.lock_path().display())))?;
        let out = self.load().map(|data| f(&data));
        let _ = FileExt::unlock(&lock);
        out
    }

    fn update<T>(&self, f: impl FnOnce(&mut StoreData) -> Result<T>) -> Result<T> {
        let lock = self.open_lock()?;
        FileExt::lock_exclusive(&lock)
            .map_err(|err| ZibError::Locked(format!("{}: {err}", self.lock_path().display())))?;
        let out = (|| -> Result<T> {
            let mut data = self.load()?;
            let value = f(&mut data)?;
            self.save(&data)?;
            Ok(value)
        })();
        let _ = FileExt::unlock(&lock);
        out
    }
}
