pub mod book_create;
pub mod book_delete;
pub mod book_list;
pub mod book_rename;
pub mod book_show;
pub mod fragment;
pub mod reference;
pub mod render;
pub mod render_info;
pub mod status;
pub mod sync;

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;

use crate::zib::audit;
use crate::zib::config::{ZibConfig, load_config};
use crate::zib::content_store::ContentStore;
use crate::zib::paths::{ZibPaths, resolve_paths};
use crate::zib::store::JsonStore;
use crate::zib::warn::{self, WarnEvent};

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }

    pub fn merge(&mut self, mut other: CommandReport) {
        self.ok &= other.ok;
        self.details.append(&mut other.details);
        self.issues.append(&mut other.issues);
    }
}

/// Everything a book command needs: resolved paths, effective config, the
/// record store and the content store rooted at the books repository.
pub struct Workspace {
    pub paths: ZibPaths,
    pub config: ZibConfig,
    pub store: JsonStore,
    pub content: ContentStore,
}

impl Workspace {
    pub fn open() -> Result<Self> {
        let paths = resolve_paths()?;
        let config = load_config(&paths)?;
        for dir in [&paths.repo_dir, &paths.state_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(Self {
            store: JsonStore::new(paths.store_file()),
            content: ContentStore::new(paths.repo_dir.clone()),
            paths,
            config,
        })
    }

    pub fn audit(&self, book_id: Option<u64>, phase: &str, status: &str, message: &str) -> Result<()> {
        audit::append_event(&self.paths, book_id, phase, status, message)
    }

    /// Runs `op`, recording a `failed` audit event when it errors.
    pub fn audited<T>(
        &self,
        book_id: Option<u64>,
        phase: &str,
        op: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        op().inspect_err(|err| self.audit_failure(book_id, phase, err))
    }

    /// Records a failed mutation before the error is handed back to the caller.
    pub fn audit_failure(&self, book_id: Option<u64>, phase: &str, err: &anyhow::Error) {
        let message = format!("{err:#}");
        if let Err(audit_err) = self.audit(book_id, phase, "failed", &message) {
            let book = book_id.map(|id| id.to_string()).unwrap_or_default();
            warn::emit(WarnEvent {
                code: "AUDIT_APPEND_FAILED",
                stage: phase,
                action: "append-audit",
                book: &book,
                path: &audit::audit_log_path(&self.paths).display().to_string(),
                reason: "audit-log-unwritable",
                err: &audit_err.to_string(),
            });
        }
    }
}
