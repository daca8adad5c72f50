//! Book lifecycle: on-disk layout plus the book record.

use crate::error::ZibError;
use crate::zib::content_store::ContentStore;
use crate::zib::model::{Book, LICENSE_FILE, MANUSCRIPT_DIR, README_FILE, RENDER_DIR};
use crate::zib::naming::{dir_name_for, normalize_title, validate_title};
use crate::zib::store::RecordStore;
use crate::zib::warn::{self, WarnEvent};
use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Clone)]
enum UndoStep {
    RemoveDir(String),
    RemoveFile(String),
}

/// Completed filesystem steps of a multi-step operation, undone in reverse
/// order when a later step fails.
struct UndoStack<'a> {
    content: &'a ContentStore,
    stage: &'static str,
    book: String,
    steps: Vec<UndoStep>,
}

impl<'a> UndoStack<'a> {
    fn new(content: &'a ContentStore, stage: &'static str, book: &str) -> Self {
        Self {
            content,
            stage,
            book: book.to_string(),
            steps: Vec::new(),
        }
    }

    fn push(&mut self, step: UndoStep) {
        self.steps.push(step);
    }

    fn commit(mut self) {
        self.steps.clear();
    }

    fn unwind(mut self) -> usize {
        let mut failed = 0usize;
        while let Some(step) = self.steps.pop() {
            let (action, path, result) = match &step {
                UndoStep::RemoveDir(path) => ("remove-dir", path, self.content.delete_dir(path)),
                UndoStep::RemoveFile(path) => ("remove-file", path, self.content.delete(path)),
            };
            if let Err(err) = result {
                if matches!(err, ZibError::NotFound(_)) {
                    continue;
                }
                failed += 1;
                warn::emit(WarnEvent {
                    code: "UNDO_FAILED",
                    stage: self.stage,
                    action,
                    book: &self.book,
                    path,
                    reason: "rollback-step-failed",
                    err: &err.to_string(),
                });
            }
        }
        failed
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    pub book: Book,
    pub references_removed: usize,
    pub fragments_removed: usize,
    pub dir_removed: bool,
}

pub fn require_book(store: &dyn RecordStore, book_id: u64) -> Result<Book> {
    store
        .find_book(book_id)?
        .ok_or_else(|| ZibError::NotFound(format!("book {book_id}")).into())
}

/// Fails unless `book` still exists with the same directory. Guards work that
/// writes below `book.dir` against a book deleted or renamed meanwhile.
pub fn ensure_current(store: &dyn RecordStore, book: &Book) -> Result<()> {
    match store.find_book(book.id)? {
        Some(current) if current.dir == book.dir => Ok(()),
        Some(current) => Err(ZibError::NotFound(format!(
            "book {} moved from `{}` to `{}`",
            book.id, book.dir, current.dir
        ))
        .into()),
        None => Err(ZibError::NotFound(format!("book {}", book.id)).into()),
    }
}

/// Normalizes and validates a title and returns it with its directory name.
/// `book_id` is the book being renamed, if any, so it may keep its own dir.
fn checked_title(
    store: &dyn RecordStore,
    content: &ContentStore,
    raw_title: &str,
    book_id: Option<u64>,
) -> Result<(String, String)> {
    let title = normalize_title(raw_title);
    validate_title(&title)?;
    let dir = dir_name_for(&title);

    if let Some(owner) = store.find_book_by_dir(&dir)? {
        if Some(owner.id) != book_id {
            return Err(ZibError::Validation(format!(
                "directory `{dir}` already belongs to book {}",
                owner.id
            ))
            .into());
        }
        return Ok((title, dir));
    }
    if content.exists(&dir) {
        return Err(ZibError::Validation(format!(
            "directory `{dir}` already exists in the repository"
        ))
        .into());
    }
    Ok((title, dir))
}

fn create_layout(content: &ContentStore, dir: &str, undo: &mut UndoStack<'_>) -> Result<()> {
    undo.push(UndoStep::RemoveDir(dir.to_string()));
    content.create_dir(format!("{dir}/{MANUSCRIPT_DIR}"))?;

    for placeholder in [README_FILE, LICENSE_FILE] {
        let path = format!("{dir}/{placeholder}");
        content.write(&path, b"")?;
        undo.push(UndoStep::RemoveFile(path));
    }

    let render = format!("{dir}/{RENDER_DIR}");
    content.create_dir(&render)?;
    undo.push(UndoStep::RemoveDir(render));
    Ok(())
}

/// Creates the directory layout and the book record. On failure every
/// completed step is undone and nothing is persisted.
pub fn create_book(store: &dyn RecordStore, content: &ContentStore, title: &str) -> Result<Book> {
    let (title, dir) = checked_title(store, content, title, None)?;

    let mut undo = UndoStack::new(content, "book-create", &dir);
    let created = create_layout(content, &dir, &mut undo)
        .and_then(|()| store.insert_book(&title, &dir));

    match created {
        Ok(book) => {
            undo.commit();
            Ok(book)
        }
        Err(err) => {
            undo.unwind();
            Err(err).with_context(|| format!("failed to create book `{title}`"))
        }
    }
}

/// Puts a half-done rename back: the artifact first (when it was moved to
/// `restore_artifact`), then the directory. Failures are only reported.
fn revert_rename(
    content: &ContentStore,
    book: &Book,
    renamed: &Book,
    restore_artifact: Option<&str>,
    reason: &str,
) {
    let mut failures = Vec::new();
    if let Some(stale_artifact) = restore_artifact {
        if let Err(err) = content.rename(renamed.render_file_path(), stale_artifact) {
            failures.push(("artifact-move-back", renamed.render_file_path(), err));
        }
    }
    if let Err(err) = content.rename(&renamed.dir, &book.dir) {
        failures.push(("move-back", renamed.dir.clone(), err));
    }
    for (action, path, err) in failures {
        warn::emit(WarnEvent {
            code: "UNDO_FAILED",
            stage: "book-rename",
            action,
            book: &book.dir,
            path: &path,
            reason,
            err: &err.to_string(),
        });
    }
}

pub fn rename_book(
    store: &dyn RecordStore,
    content: &ContentStore,
    book_id: u64,
    new_title: &str,
) -> Result<Book> {
    let book = require_book(store, book_id)?;
    let (title, dir) = checked_title(store, content, new_title, Some(book.id))?;

    let renamed = Book {
        title,
        dir,
        ..book.clone()
    };
    if renamed.dir == book.dir {
        store.save_book(&renamed)?;
        return Ok(renamed);
    }

    content
        .rename(&book.dir, &renamed.dir)
        .with_context(|| format!("failed to move `{}` to `{}`", book.dir, renamed.dir))?;

    // The artifact name follows the directory name.
    let stale_artifact = format!("{}/{}", renamed.render_path(), book.render_filename());
    let mut artifact_moved = false;
    if content.exists(&stale_artifact) {
        if let Err(err) = content.rename(&stale_artifact, renamed.render_file_path()) {
            revert_rename(content, &book, &renamed, None, "artifact-move-failed");
            return Err(err).context("failed to rename render artifact");
        }
        artifact_moved = true;
    }

    if let Err(err) = store.save_book(&renamed) {
        let artifact = artifact_moved.then_some(stale_artifact.as_str());
        revert_rename(content, &book, &renamed, artifact, "record-save-failed");
        return Err(err).context("failed to save renamed book");
    }

    Ok(renamed)
}

/// Removes references, fragments, the directory subtree and the record.
pub fn delete_book(
    store: &dyn RecordStore,
    content: &ContentStore,
    book_id: u64,
) -> Result<DeleteOutcome> {
    let book = require_book(store, book_id)?;

    let references_removed = store.delete_references_for_book(book.id)?;
    let fragments_removed = store.delete_fragments_for_book(book.id)?;

    let dir_removed = match content.delete_dir(book.book_path()) {
        Ok(()) => true,
        Err(ZibError::NotFound(_)) => false,
        Err(err) => {
            return Err(err).with_context(|| format!("failed to remove `{}`", book.dir));
        }
    };

    store.delete_book(book.id)?;

    Ok(DeleteOutcome {
        book,
        references_removed,
        fragments_removed,
        dir_removed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::domain_error;
    use crate::zib::model::{FragmentKind, NewFragment};
    use crate::zib::config::ManuscriptConfig;
    use crate::zib::reconcile::sync_book;
    use crate::zib::render::render_book;
    use crate::zib::store::{DataAccess, MemoryStore, StoreData};
    use tempfile::tempdir;

    /// Reads work, every write fails.
    struct ReadOnlyStore(MemoryStore);

    impl DataAccess for ReadOnlyStore {
        fn read<T>(&self, f: impl FnOnce(&StoreData) -> T) -> Result<T> {
            self.0.read(f)
        }

        fn update<T>(&self, _f: impl FnOnce(&mut StoreData) -> Result<T>) -> Result<T> {
            anyhow::bail!("store is read-only")
        }
    }

    #[test]
    fn create_lays_out_directories_and_placeholders() {
        let tmp = tempdir().expect("tempdir");
        let content = ContentStore::new(tmp.path());
        let store = MemoryStore::new();

        let book = create_book(&store, &content, "  My First Book ").expect("create");
        assert_eq!(book.title, "My First Book");
        assert_eq!(book.dir, "my_first_book");
        for path in [
            "my_first_book/manuscript",
            "my_first_book/render",
            "my_first_book/README.md",
            "my_first_book/license.md",
        ] {
            assert!(content.exists(path), "missing {path}");
        }
        assert_eq!(store.books().expect("books"), vec![book]);
    }

    #[test]
    fn invalid_title_mutates_nothing() {
        let tmp = tempdir().expect("tempdir");
        let content = ContentStore::new(tmp.path());
        let store = MemoryStore::new();

        let err = create_book(&store, &content, "ab").expect_err("too short");
        assert!(matches!(domain_error(&err), Some(ZibError::Validation(_))));
        assert!(content.list("").expect("list").is_empty());
        assert!(store.books().expect("books").is_empty());
    }

    #[test]
    fn failed_record_save_unwinds_layout() {
        let tmp = tempdir().expect("tempdir");
        let content = ContentStore::new(tmp.path());
        let store = ReadOnlyStore(MemoryStore::new());

        assert!(create_book(&store, &content, "Doomed Book").is_err());
        assert!(!content.exists("doomed_book"));
    }

    #[test]
    fn duplicate_directory_is_rejected() {
        let tmp = tempdir().expect("tempdir");
        let content = ContentStore::new(tmp.path());
        let store = MemoryStore::new();

        create_book(&store, &content, "Same Name").expect("first");
        let err = create_book(&store, &content, "same name").expect_err("second");
        assert!(matches!(domain_error(&err), Some(ZibError::Validation(_))));

        content.create_dir("stray_dir").expect("stray");
        assert!(create_book(&store, &content, "Stray Dir").is_err());
        assert!(content.exists("stray_dir"));
    }

    #[test]
    fn rename_moves_subtree_and_artifact() {
        let tmp = tempdir().expect("tempdir");
        let content = ContentStore::new(tmp.path());
        let store = MemoryStore::new();
        let book = create_book(&store, &content, "Old Title").expect("create");
        content
            .write("old_title/manuscript/a.md", b"a")
            .expect("write");
        content
            .write(book.render_file_path(), b"<html></html>")
            .expect("artifact");

        let renamed = rename_book(&store, &content, book.id, "New Title").expect("rename");
        assert_eq!(renamed.dir, "new_title");
        assert!(!content.exists("old_title"));
        assert!(content.exists("new_title/manuscript/a.md"));
        assert!(content.exists("new_title/render/new_title.html"));
        assert_eq!(
            store.find_book(book.id).expect("find"),
            Some(renamed.clone())
        );
    }

    #[test]
    fn rename_restores_directory_when_artifact_cannot_move() {
        let tmp = tempdir().expect("tempdir");
        let content = ContentStore::new(tmp.path());
        let store = MemoryStore::new();
        let book = create_book(&store, &content, "Old").expect("create");
        content
            .write(book.render_file_path(), b"old render")
            .expect("artifact");
        // Occupies the artifact name the rename would move to.
        content
            .write("old/render/new.html", b"user file")
            .expect("clash");

        assert!(rename_book(&store, &content, book.id, "New").is_err());
        assert!(!content.exists("new"));
        assert_eq!(content.read("old/render/old.html").expect("old"), b"old render");
        assert_eq!(content.read("old/render/new.html").expect("clash"), b"user file");
        assert_eq!(store.find_book(book.id).expect("find"), Some(book));
    }

    #[test]
    fn rename_restores_directory_and_artifact_when_save_fails() {
        let tmp = tempdir().expect("tempdir");
        let content = ContentStore::new(tmp.path());
        let inner = MemoryStore::new();
        let book = create_book(&inner, &content, "Old Title").expect("create");
        content
            .write(book.render_file_path(), b"<html></html>")
            .expect("artifact");
        let store = ReadOnlyStore(inner);

        assert!(rename_book(&store, &content, book.id, "New Title").is_err());
        assert!(!content.exists("new_title"));
        assert!(content.exists("old_title/render/old_title.html"));
        assert!(!content.exists("old_title/render/new_title.html"));
        assert_eq!(store.find_book(book.id).expect("find"), Some(book));
    }

    #[test]
    fn rename_keeping_dir_only_updates_title() {
        let tmp = tempdir().expect("tempdir");
        let content = ContentStore::new(tmp.path());
        let store = MemoryStore::new();
        let book = create_book(&store, &content, "Title").expect("create");

        let renamed = rename_book(&store, &content, book.id, "title!").expect("rename");
        assert_eq!(renamed.dir, "title");
        assert_eq!(renamed.title, "title!");
        assert!(content.exists("title/manuscript"));
    }

    #[test]
    fn delete_cascades_to_fragments_and_references() {
        let tmp = tempdir().expect("tempdir");
        let content = ContentStore::new(tmp.path());
        let store = MemoryStore::new();
        let book = create_book(&store, &content, "Doomed").expect("create");
        let other = create_book(&store, &content, "Survivor").expect("other");

        store
            .insert_reference(book.id, "https://example.com", 1)
            .expect("reference");
        for (book_id, name) in [(book.id, "a.md"), (other.id, "b.md")] {
            store
                .insert_fragment(NewFragment {
                    book_id,
                    position: 1,
                    full_filename: name.to_string(),
                    menu_label: name.to_string(),
                    kind: FragmentKind::Local,
                    child: false,
                    reference_id: None,
                })
                .expect("fragment");
        }

        let out = delete_book(&store, &content, book.id).expect("delete");
        assert_eq!(out.references_removed, 1);
        assert_eq!(out.fragments_removed, 1);
        assert!(out.dir_removed);
        assert!(!content.exists("doomed"));
        assert!(store.find_book(book.id).expect("find").is_none());
        assert_eq!(store.fragments(other.id).expect("other").len(), 1);
    }

    #[test]
    fn delete_tolerates_missing_directory() {
        let tmp = tempdir().expect("tempdir");
        let content = ContentStore::new(tmp.path());
        let store = MemoryStore::new();
        let book = create_book(&store, &content, "Vanished").expect("create");
        content.delete_dir("vanished").expect("remove");

        let out = delete_book(&store, &content, book.id).expect("delete");
        assert!(!out.dir_removed);
        assert!(store.books().expect("books").is_empty());
    }

    #[test]
    fn work_on_a_deleted_book_does_not_recreate_its_directory() {
        let tmp = tempdir().expect("tempdir");
        let content = ContentStore::new(tmp.path());
        let store = MemoryStore::new();
        let book = create_book(&store, &content, "Doomed").expect("create");
        delete_book(&store, &content, book.id).expect("delete");

        let err = render_book(&store, &content, &book).expect_err("render");
        assert!(matches!(domain_error(&err), Some(ZibError::NotFound(_))));
        let cfg = ManuscriptConfig::default();
        assert!(sync_book(&store, &content, &book, &cfg).is_err());
        assert!(!content.exists("doomed"));
    }

    #[test]
    fn work_on_a_renamed_book_does_not_recreate_the_old_directory() {
        let tmp = tempdir().expect("tempdir");
        let content = ContentStore::new(tmp.path());
        let store = MemoryStore::new();
        let before = create_book(&store, &content, "Old Name").expect("create");
        rename_book(&store, &content, before.id, "New Name").expect("rename");

        assert!(render_book(&store, &content, &before).is_err());
        assert!(!content.exists("old_name"));
        ensure_current(&store, &require_book(&store, before.id).expect("book")).expect("current");
    }
}
