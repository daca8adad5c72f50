use anyhow::Result;

use crate::commands::{CommandReport, Workspace};
use crate::zib::book::create_book;

pub fn run(title: &str) -> Result<CommandReport> {
    let ws = Workspace::open()?;
    let mut report = CommandReport::new("book-create");

    let book = ws.audited(None, "book-create", || {
        create_book(&ws.store, &ws.content, title)
    })?;
    ws.audit(
        Some(book.id),
        "book-create",
        "ok",
        &format!("created `{}` in {}", book.title, book.dir),
    )?;

    report.detail(format!("book_id={}", book.id));
    report.detail(format!("title={}", book.title));
    report.detail(format!("dir={}", book.dir));
    report.detail(format!(
        "manuscript_dir={}",
        ws.paths.repo_dir.join(book.manuscript_path()).display()
    ));
    Ok(report)
}
