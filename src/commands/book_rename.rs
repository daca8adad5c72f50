use anyhow::Result;

use crate::commands::{CommandReport, Workspace};
use crate::zib::book::{rename_book, require_book};
use crate::zib::lock;

pub fn run(book_id: u64, title: &str) -> Result<CommandReport> {
    let ws = Workspace::open()?;
    let mut report = CommandReport::new("book-rename");

    let _lock = lock::acquire(&ws.paths, book_id)?;
    let before = require_book(&ws.store, book_id)?;
    let book = ws.audited(Some(book_id), "book-rename", || {
        rename_book(&ws.store, &ws.content, book_id, title)
    })?;
    ws.audit(
        Some(book.id),
        "book-rename",
        "ok",
        &format!("`{}` ({}) -> `{}` ({})", before.title, before.dir, book.title, book.dir),
    )?;

    report.detail(format!("book_id={}", book.id));
    report.detail(format!("title={}", book.title));
    report.detail(format!("dir={}", book.dir));
    if before.dir != book.dir {
        report.detail(format!("moved_from={}", before.dir));
    }
    Ok(report)
}
