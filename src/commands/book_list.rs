use anyhow::Result;

use crate::commands::{CommandReport, Workspace};
use crate::zib::store::RecordStore;

pub fn run() -> Result<CommandReport> {
    let ws = Workspace::open()?;
    let mut report = CommandReport::new("book-list");

    let books = ws.store.books()?;
    report.detail(format!("books={}", books.len()));
    for book in books {
        report.detail(format!(
            "book id={} dir={} title={}",
            book.id, book.dir, book.title
        ));
    }
    Ok(report)
}
