use anyhow::Result;

use crate::commands::{CommandReport, Workspace};
use crate::zib::book::require_book;
use crate::zib::lock;
use crate::zib::model::Book;
use crate::zib::reconcile::sync_book;

/// Reconciles the index while the caller holds the book lock.
pub fn sync_locked(ws: &Workspace, book: &Book) -> Result<CommandReport> {
    let mut report = CommandReport::new("sync");

    let out = ws.audited(Some(book.id), "sync", || {
        sync_book(&ws.store, &ws.content, book, &ws.config.manuscript)
    })?;
    ws.audit(
        Some(book.id),
        "sync",
        "ok",
        &format!(
            "eligible={} added={} removed={}",
            out.eligible.len(),
            out.added.len(),
            out.removed.len()
        ),
    )?;

    report.detail(format!("book_id={}", book.id));
    report.detail(format!("eligible={}", out.eligible.len()));
    for fragment in &out.added {
        report.detail(format!(
            "added position={} file={}",
            fragment.position, fragment.full_filename
        ));
    }
    for fragment in &out.removed {
        report.detail(format!(
            "removed kind={} file={}",
            fragment.kind, fragment.full_filename
        ));
    }
    if !out.changed() {
        report.detail("index already up to date");
    }
    Ok(report)
}

pub fn run(book_id: u64) -> Result<CommandReport> {
    let ws = Workspace::open()?;
    let _lock = lock::acquire(&ws.paths, book_id)?;
    let book = require_book(&ws.store, book_id)?;
    sync_locked(&ws, &book)
}
