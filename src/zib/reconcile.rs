//! Keeps a book's fragment index an exact mirror of its manuscript tree.
//!
//! Scanning walks the manuscript listing in order and stops for good at the
//! sentinel entry (`Book.txt` by default): files listed after it are never
//! eligible, even with an allowed extension. Eligible files missing from the
//! index are appended as `local` fragments; indexed fragments whose file is not
//! eligible are deleted whatever their kind.

use crate::error::ZibError;
use crate::zib::book::ensure_current;
use crate::zib::config::ManuscriptConfig;
use crate::zib::content_store::{ContentEntry, ContentStore};
use crate::zib::model::{Book, Fragment, FragmentKind, NewFragment};
use crate::zib::naming::guess_menu_label;
use crate::zib::store::RecordStore;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncOutcome {
    pub eligible: Vec<String>,
    pub added: Vec<Fragment>,
    pub removed: Vec<Fragment>,
}

impl SyncOutcome {
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }
}

/// Eligible fragment files of a listing, in listing order.
pub fn eligible_fragment_files(entries: &[ContentEntry], cfg: &ManuscriptConfig) -> Vec<String> {
    let mut files = Vec::new();
    for entry in entries {
        if entry.path == cfg.sentinel {
            break;
        }
        let allowed = entry
            .extension
            .as_deref()
            .is_some_and(|ext| cfg.allowed_extensions.iter().any(|a| a == ext));
        if entry.is_file() && allowed {
            files.push(entry.path.clone());
        }
    }
    files
}

pub fn list_fragment_files(
    content: &ContentStore,
    book: &Book,
    cfg: &ManuscriptConfig,
) -> Result<Vec<String>> {
    let entries = content
        .list(book.manuscript_path())
        .with_context(|| format!("failed to list manuscript of book {}", book.id))?;
    Ok(eligible_fragment_files(&entries, cfg))
}

/// Position for the `index`-th eligible file out of `eligible_count`, never at
/// or below a position already taken in the book.
pub fn new_fragment_position(
    eligible_count: usize,
    index: usize,
    max_used: i64,
) -> Result<i64, ZibError> {
    let candidate = i64::try_from(eligible_count + index + 1).unwrap_or(i64::MAX);
    let next_free = max_used.checked_add(1).ok_or_else(|| {
        ZibError::Validation(format!(
            "no position left after {max_used}; lower the highest fragment position"
        ))
    })?;
    Ok(candidate.max(next_free))
}

pub fn sync_book(
    store: &dyn RecordStore,
    content: &ContentStore,
    book: &Book,
    cfg: &ManuscriptConfig,
) -> Result<SyncOutcome> {
    ensure_current(store, book)?;
    let files = list_fragment_files(content, book, cfg)?;
    let mut out = SyncOutcome {
        eligible: files.clone(),
        ..SyncOutcome::default()
    };

    let mut max_used = store
        .fragments(book.id)?
        .iter()
        .map(|f| f.position)
        .max()
        .unwrap_or(0);

    for (index, file) in files.iter().enumerate() {
        if store.find_fragment_by_filename(book.id, file)?.is_some() {
            continue;
        }

        let position = new_fragment_position(files.len(), index, max_used)?;
        let fragment = store.insert_fragment(NewFragment {
            book_id: book.id,
            position,
            full_filename: file.clone(),
            menu_label: guess_menu_label(file),
            kind: FragmentKind::Local,
            child: false,
            reference_id: None,
        })?;
        max_used = max_used.max(fragment.position);
        out.added.push(fragment);
    }

    let keep = files.into_iter().collect::<BTreeSet<_>>();
    out.removed = store.delete_fragments_not_in(book.id, &keep)?;

    Ok(out)
}
