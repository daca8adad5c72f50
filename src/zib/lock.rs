use crate::error::ZibError;
use crate::zib::paths::ZibPaths;
use crate::zib::util::now_epoch_secs;
use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockPayload {
    pub pid: u32,
    pub book_id: u64,
    pub build_uuid: String,
    pub acquired_at_epoch_secs: u64,
}

/// Exclusive hold on one book's mutations. Released on drop.
#[derive(Debug)]
pub struct BookLock {
    file: fs::File,
}

impl Drop for BookLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

pub fn lock_path(paths: &ZibPaths, book_id: u64) -> PathBuf {
    paths.locks_dir().join(format!("book-{book_id}.lock"))
}

fn lock_timeout() -> Duration {
    match env::var("ZIBALDONE_LOCK_TIMEOUT_SECS") {
        Ok(v) => v
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_LOCK_TIMEOUT),
        Err(_) => DEFAULT_LOCK_TIMEOUT,
    }
}

pub fn acquire(paths: &ZibPaths, book_id: u64) -> Result<BookLock> {
    acquire_with_timeout(paths, book_id, lock_timeout())
}

pub fn acquire_with_timeout(paths: &ZibPaths, book_id: u64, timeout: Duration) -> Result<BookLock> {
    let path = lock_path(paths, book_id);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let deadline = Instant::now() + timeout;
    loop {
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => break,
            Err(_) if Instant::now() < deadline => thread::sleep(LOCK_POLL_INTERVAL),
            Err(err) => {
                let holder = match read_payload(paths, book_id) {
                    Ok(Some(p)) => format!("held by pid {} since {}", p.pid, p.acquired_at_epoch_secs),
                    _ => "holder unknown".to_string(),
                };
                return Err(ZibError::Locked(format!(
                    "book {book_id} is busy, {holder} ({}): {err}",
                    path.display()
                ))
                .into());
            }
        }
    }

    let payload = LockPayload {
        pid: std::process::id(),
        book_id,
        build_uuid: env!("BUILD_UUID").to_string(),
        acquired_at_epoch_secs: now_epoch_secs()?,
    };
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(serde_json::to_string(&payload)?.as_bytes())?;
    file.flush()?;

    Ok(BookLock { file })
}

pub fn read_payload(paths: &ZibPaths, book_id: u64) -> Result<Option<LockPayload>> {
    let path = lock_path(paths, book_id);
    if !path.exists() {
        return Ok(None);
    }
    let raw =
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let payload = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(payload))
}
