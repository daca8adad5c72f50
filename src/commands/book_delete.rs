use anyhow::Result;

use crate::commands::{CommandReport, Workspace};
use crate::zib::book::delete_book;
use crate::zib::lock;

pub fn run(book_id: u64) -> Result<CommandReport> {
    let ws = Workspace::open()?;
    let mut report = CommandReport::new("book-delete");

    let _lock = lock::acquire(&ws.paths, book_id)?;
    let out = ws.audited(Some(book_id), "book-delete", || {
        delete_book(&ws.store, &ws.content, book_id)
    })?;
    ws.audit(
        Some(book_id),
        "book-delete",
        "ok",
        &format!(
            "removed `{}`: {} fragments, {} references, dir_removed={}",
            out.book.title, out.fragments_removed, out.references_removed, out.dir_removed
        ),
    )?;

    report.detail(format!("book_id={}", out.book.id));
    report.detail(format!("fragments_removed={}", out.fragments_removed));
    report.detail(format!("references_removed={}", out.references_removed));
    report.detail(format!("dir_removed={}", out.dir_removed));
    Ok(report)
}
