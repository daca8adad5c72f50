use anyhow::Result;

use crate::commands::{CommandReport, Workspace};
use crate::zib::book::require_book;
use crate::zib::reconcile::list_fragment_files;
use crate::zib::store::RecordStore;

pub fn run(book_id: u64) -> Result<CommandReport> {
    let ws = Workspace::open()?;
    let mut report = CommandReport::new("book-show");

    let book = require_book(&ws.store, book_id)?;
    report.detail(format!("book_id={}", book.id));
    report.detail(format!("title={}", book.title));
    report.detail(format!("dir={}", ws.paths.repo_dir.join(book.book_path()).display()));

    let fragments = ws.store.fragments(book.id)?;
    let references = ws.store.references(book.id)?;
    report.detail(format!("fragments={}", fragments.len()));
    report.detail(format!("references={}", references.len()));

    // Drift between the index and the manuscript tree is reported, never fixed here.
    match list_fragment_files(&ws.content, &book, &ws.config.manuscript) {
        Ok(files) => {
            let unindexed = files
                .iter()
                .filter(|file| !fragments.iter().any(|f| &f.full_filename == *file))
                .count();
            let stale = fragments
                .iter()
                .filter(|f| !files.contains(&f.full_filename))
                .count();
            report.detail(format!("eligible_files={}", files.len()));
            if unindexed > 0 || stale > 0 {
                report.issue(format!(
                    "index out of date: {unindexed} unindexed, {stale} stale; run `zibaldone sync {}`",
                    book.id
                ));
            }
        }
        Err(err) => report.issue(format!("manuscript unreadable: {err:#}")),
    }

    report.detail(format!(
        "rendered={}",
        ws.content.exists(book.render_file_path())
    ));
    Ok(report)
}
