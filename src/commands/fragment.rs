use anyhow::Result;

use crate::commands::{CommandReport, Workspace};
use crate::zib::book::require_book;
use crate::zib::index::{FragmentEdit, edit_fragment};
use crate::zib::lock;
use crate::zib::store::RecordStore;

pub fn list(book_id: u64) -> Result<CommandReport> {
    let ws = Workspace::open()?;
    let mut report = CommandReport::new("fragment-list");

    let book = require_book(&ws.store, book_id)?;
    let fragments = ws.store.fragments(book.id)?;
    report.detail(format!("book_id={}", book.id));
    report.detail(format!("fragments={}", fragments.len()));
    for f in fragments {
        let reference = f
            .reference_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        report.detail(format!(
            "fragment id={} position={} kind={} child={} reference={} file={} label={}",
            f.id, f.position, f.kind, f.child, reference, f.full_filename, f.menu_label
        ));
    }
    Ok(report)
}

pub fn edit(book_id: u64, full_filename: &str, edit: &FragmentEdit) -> Result<CommandReport> {
    let ws = Workspace::open()?;
    let mut report = CommandReport::new("fragment-edit");

    let _lock = lock::acquire(&ws.paths, book_id)?;
    let book = require_book(&ws.store, book_id)?;
    let fragment = ws.audited(Some(book.id), "fragment-edit", || {
        edit_fragment(&ws.store, &book, full_filename, edit)
    })?;
    ws.audit(
        Some(book.id),
        "fragment-edit",
        "ok",
        &format!(
            "{} position={} child={} label={}",
            fragment.full_filename, fragment.position, fragment.child, fragment.menu_label
        ),
    )?;

    report.detail(format!("fragment_id={}", fragment.id));
    report.detail(format!("position={}", fragment.position));
    report.detail(format!("kind={}", fragment.kind));
    report.detail(format!("child={}", fragment.child));
    report.detail(format!("menu_label={}", fragment.menu_label));
    Ok(report)
}
