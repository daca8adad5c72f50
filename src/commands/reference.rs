use anyhow::Result;

use crate::commands::{CommandReport, Workspace};
use crate::zib::book::require_book;
use crate::zib::index::add_reference;
use crate::zib::lock;
use crate::zib::store::RecordStore;
use crate::zib::util::now_epoch_secs;

pub fn add(book_id: u64, html_url: &str) -> Result<CommandReport> {
    let ws = Workspace::open()?;
    let mut report = CommandReport::new("reference-add");

    let _lock = lock::acquire(&ws.paths, book_id)?;
    let book = require_book(&ws.store, book_id)?;
    let reference = ws.audited(Some(book.id), "reference-add", || {
        add_reference(&ws.store, &book, html_url, now_epoch_secs()?)
    })?;
    ws.audit(Some(book.id), "reference-add", "ok", &reference.html_url)?;

    report.detail(format!("reference_id={}", reference.id));
    report.detail(format!("html_url={}", reference.html_url));
    Ok(report)
}

pub fn list(book_id: u64) -> Result<CommandReport> {
    let ws = Workspace::open()?;
    let mut report = CommandReport::new("reference-list");

    let book = require_book(&ws.store, book_id)?;
    let references = ws.store.references(book.id)?;
    report.detail(format!("references={}", references.len()));
    for r in references {
        report.detail(format!(
            "reference id={} created_at_epoch_secs={} url={}",
            r.id, r.created_at_epoch_secs, r.html_url
        ));
    }
    Ok(report)
}
