use anyhow::Result;

use crate::commands::{CommandReport, Workspace};
use crate::zib::book::require_book;
use crate::zib::render::render_info;

pub fn run(book_id: u64) -> Result<CommandReport> {
    let ws = Workspace::open()?;
    let mut report = CommandReport::new("render-info");

    let book = require_book(&ws.store, book_id)?;
    report.detail(format!("book_id={}", book.id));
    match render_info(&ws.content, &book, &ws.config.render)? {
        Some(info) => {
            report.detail("rendered=true");
            report.detail(format!("filepath={}", info.filepath));
            report.detail(format!("created={}", info.created));
            report.detail(format!("created_epoch_secs={}", info.created_epoch_secs));
        }
        None => report.detail("rendered=false"),
    }
    Ok(report)
}
