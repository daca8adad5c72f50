use anyhow::Result;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ZibPaths {
    pub home: PathBuf,
    pub repo_dir: PathBuf,
    pub state_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl ZibPaths {
    pub fn store_file(&self) -> PathBuf {
        self.state_dir.join("store.json")
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.state_dir.join("locks")
    }
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(PathBuf::from(v.trim())),
        _ => None,
    }
}

pub fn resolve_paths() -> Result<ZibPaths> {
    let home = match env_path("ZIBALDONE_HOME") {
        Some(home) => home,
        None => required_home_dir()?.join("zibaldone"),
    };

    let repo_dir = env_or_default_path("ZIBALDONE_REPO_DIR", home.join("books"));
    let state_dir = env_or_default_path("ZIBALDONE_STATE_DIR", home.join("state"));
    let logs_dir = env_or_default_path("ZIBALDONE_LOGS_DIR", home.join("logs"));

    Ok(ZibPaths {
        home,
        repo_dir,
        state_dir,
        logs_dir,
    })
}

#[cfg(test)]
pub fn test_paths(root: &std::path::Path) -> ZibPaths {
    ZibPaths {
        home: root.to_path_buf(),
        repo_dir: root.join("books"),
        state_dir: root.join("state"),
        logs_dir: root.join("logs"),
    }
}
