use crate::zib::paths::ZibPaths;
use crate::zib::util::now_epoch_secs;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub at_epoch_secs: u64,
    pub book_id: Option<u64>,
    pub phase: String,
    pub status: String,
    pub message: String,
}

pub fn audit_log_path(paths: &ZibPaths) -> PathBuf {
    paths.logs_dir.join("audit.log")
}

pub fn append_event(
    paths: &ZibPaths,
    book_id: Option<u64>,
    phase: &str,
    status: &str,
    message: &str,
) -> Result<()> {
    fs::create_dir_all(&paths.logs_dir)
        .with_context(|| format!("failed to create {}", paths.logs_dir.display()))?;
    let event = AuditEvent {
        at_epoch_secs: now_epoch_secs()?,
        book_id,
        phase: phase.to_string(),
        status: status.to_string(),
        message: message.to_string(),
    };

    let line = format!("{}\n", serde_json::to_string(&event)?);
    let path = audit_log_path(paths);
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

pub fn read_events(paths: &ZibPaths) -> Result<Vec<AuditEvent>> {
    let path = audit_log_path(paths);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw =
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut out = Vec::new();
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let event: AuditEvent = serde_json::from_str(trimmed)
            .with_context(|| format!("failed to parse audit line in {}", path.display()))?;
        out.push(event);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zib::paths::test_paths;
    use tempfile::tempdir;

    #[test]
    fn events_append_in_order() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(tmp.path());

        append_event(&paths, Some(1), "sync", "ok", "added=2 removed=0").expect("append 1");
        append_event(&paths, None, "book-create", "failed", "title too short").expect("append 2");

        let events = read_events(&paths).expect("read");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].phase, "sync");
        assert_eq!(events[0].book_id, Some(1));
        assert_eq!(events[1].status, "failed");
    }
}
