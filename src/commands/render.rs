use anyhow::Result;

use crate::commands::sync::sync_locked;
use crate::commands::{CommandReport, Workspace};
use crate::error::domain_error;
use crate::zib::book::require_book;
use crate::zib::lock;
use crate::zib::render::render_book;
use crate::zib::warn::{self, WarnEvent};

pub fn run(book_id: u64, sync_first: bool) -> Result<CommandReport> {
    let ws = Workspace::open()?;
    let mut report = CommandReport::new("render");

    let _lock = lock::acquire(&ws.paths, book_id)?;
    let book = require_book(&ws.store, book_id)?;
    if sync_first {
        report.merge(sync_locked(&ws, &book)?);
    }

    let out = ws.audited(Some(book.id), "render", || {
        render_book(&ws.store, &ws.content, &book)
    });
    let out = match out {
        Ok(out) => out,
        Err(err) => {
            let code = domain_error(&err).map(|e| e.code().as_str()).unwrap_or("E000_UNKNOWN");
            warn::emit(WarnEvent {
                code,
                stage: "render",
                action: "abort",
                book: &book.id.to_string(),
                path: &book.render_file_path(),
                reason: "previous-artifact-kept",
                err: &format!("{err:#}"),
            });
            return Err(err);
        }
    };
    ws.audit(
        Some(book.id),
        "render",
        "ok",
        &format!(
            "fragments={} bytes={} sha256={}",
            out.items.len(),
            out.bytes,
            out.content_hash
        ),
    )?;

    report.detail(format!("book_id={}", book.id));
    report.detail(format!("fragments={}", out.items.len()));
    report.detail(format!("bytes={}", out.bytes));
    report.detail(format!("sha256={}", out.content_hash));
    report.detail(format!("path={}", out.path.display()));
    Ok(report)
}
