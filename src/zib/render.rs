use crate::error::ZibError;
use crate::zib::book::ensure_current;
use crate::zib::config::RenderConfig;
use crate::zib::content_store::ContentStore;
use crate::zib::markdown::converter_for;
use crate::zib::model::{Book, RenderInfo, RenderItem};
use crate::zib::store::RecordStore;
use crate::zib::util::sha256_hex;
use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
pub struct RenderOutcome {
    pub path: PathBuf,
    pub bytes: usize,
    pub content_hash: String,
    pub items: Vec<RenderItem>,
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Converts every fragment of the book, in position order. The first fragment
/// whose file is missing or unreadable aborts the whole conversion.
pub fn fragments_to_html(
    store: &dyn RecordStore,
    content: &ContentStore,
    book: &Book,
) -> Result<Vec<RenderItem>> {
    let manuscript = content.scoped(book.manuscript_path())?;
    let mut items = Vec::new();

    for fragment in store.fragments(book.id)? {
        if !manuscript.exists(&fragment.full_filename) {
            return Err(ZibError::NotFound(format!(
                "fragment file `{}` of book {}",
                fragment.full_filename, book.id
            ))
            .into());
        }
        let raw = manuscript
            .read_to_string(&fragment.full_filename)
            .with_context(|| format!("failed to read fragment `{}`", fragment.full_filename))?;

        let origin = match fragment.reference_id {
            Some(reference_id) => {
                let reference = store.find_reference(reference_id)?.ok_or_else(|| {
                    ZibError::NotFound(format!(
                        "reference {reference_id} of fragment `{}`",
                        fragment.full_filename
                    ))
                })?;
                Some(reference.html_url)
            }
            None => None,
        };

        items.push(RenderItem {
            id: fragment.id,
            child: fragment.child,
            menu_label: fragment.menu_label.clone(),
            content: converter_for(fragment.kind).convert(&raw),
            origin,
        });
    }

    Ok(items)
}

pub fn assemble_document(book: &Book, items: &[RenderItem]) -> String {
    let title = escape_html(&book.title);
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n");
    out.push_str("<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>{title}</title>\n"));
    out.push_str("</head>\n<body>\n");
    out.push_str(&format!("<h1 class=\"book-title\">{title}</h1>\n"));

    out.push_str("<nav class=\"book-menu\">\n<ul>\n");
    for item in items {
        let class = if item.child { " class=\"child\"" } else { "" };
        out.push_str(&format!(
            "<li{class}><a href=\"#fragment-{}\">{}</a></li>\n",
            item.id,
            escape_html(&item.menu_label)
        ));
    }
    out.push_str("</ul>\n</nav>\n");

    for item in items {
        let class = if item.child {
            "fragment child"
        } else {
            "fragment"
        };
        out.push_str(&format!("<section id=\"fragment-{}\" class=\"{class}\"", item.id));
        if let Some(origin) = &item.origin {
            out.push_str(&format!(" data-origin=\"{}\"", escape_html(origin)));
        }
        out.push_str(">\n");
        out.push_str(&item.content);
        if let Some(origin) = &item.origin {
            let origin = escape_html(origin);
            out.push_str(&format!(
                "<p class=\"origin\"><a href=\"{origin}\">{origin}</a></p>\n"
            ));
        }
        out.push_str("</section>\n");
    }

    out.push_str("</body>\n</html>\n");
    out
}

/// Replaces the book's render artifact with `html`.
pub fn store_render(content: &ContentStore, book: &Book, html: &str) -> Result<PathBuf> {
    let artifact = book.render_file_path();
    if content.exists(&artifact) {
        content.delete(&artifact)?;
    }
    content.write(&artifact, html.as_bytes())?;
    Ok(content.absolute(&artifact)?)
}

/// Converts, assembles and persists the book. Nothing is written when any
/// fragment cannot be rendered.
pub fn render_book(
    store: &dyn RecordStore,
    content: &ContentStore,
    book: &Book,
) -> Result<RenderOutcome> {
    ensure_current(store, book)?;
    let items = fragments_to_html(store, content, book)
        .with_context(|| format!("render of book {} aborted", book.id))?;
    let html = assemble_document(book, &items);
    let path = store_render(content, book, &html)?;

    Ok(RenderOutcome {
        path,
        bytes: html.len(),
        content_hash: sha256_hex(html.as_bytes()),
        items,
    })
}

/// Metadata of the last render, or `None` when the book was never rendered.
pub fn render_info(
    content: &ContentStore,
    book: &Book,
    cfg: &RenderConfig,
) -> Result<Option<RenderInfo>> {
    let artifact = book.render_file_path();
    if !content.exists(&artifact) {
        return Ok(None);
    }

    let modified = content.timestamp(&artifact)?;
    let tz = cfg.tz()?;
    let mut created = String::new();
    write!(
        created,
        "{}",
        modified
            .with_timezone(&tz)
            .format(cfg.timestamp_format.as_str())
    )
    .map_err(|_| anyhow!("invalid render timestamp format `{}`", cfg.timestamp_format))?;

    let absolute = content.absolute(&artifact)?;
    let absolute = std::path::absolute(&absolute).unwrap_or(absolute);

    Ok(Some(RenderInfo {
        filepath: absolute.display().to_string(),
        created,
        created_epoch_secs: u64::try_from(modified.timestamp()).unwrap_or(0),
    }))
}
