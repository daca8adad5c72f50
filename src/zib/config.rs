use anyhow::{Result, anyhow};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::zib::paths::ZibPaths;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManuscriptConfig {
    pub allowed_extensions: Vec<String>,
    /// Listing entry that stops fragment scanning (Leanpub's index file).
    pub sentinel: String,
}

impl Default for ManuscriptConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: vec!["txt".to_string(), "md".to_string()],
            sentinel: "Book.txt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub timestamp_format: String,
    pub timezone: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            timestamp_format: "%a, %Y-%m-%d %H:%M:%S".to_string(),
            timezone: "UTC".to_string(),
        }
    }
}

impl RenderConfig {
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .trim()
            .parse::<Tz>()
            .map_err(|err| anyhow!("invalid render timezone `{}`: {err}", self.timezone))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ZibConfig {
    pub manuscript: ManuscriptConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialZibConfig {
    manuscript: Option<ManuscriptConfig>,
    render: Option<RenderConfig>,
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn env_or_csv(var: &str, fallback: &[String]) -> Vec<String> {
    match env::var(var) {
        Ok(v) => {
            let out = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.trim_start_matches('.').to_owned())
                .collect::<Vec<_>>();
            if out.is_empty() {
                fallback.to_vec()
            } else {
                out
            }
        }
        Err(_) => fallback.to_vec(),
    }
}

fn validate(cfg: &ZibConfig) -> Result<()> {
    if cfg.manuscript.allowed_extensions.is_empty() {
        return Err(anyhow!(
            "invalid manuscript extensions: at least one extension is required"
        ));
    }
    if cfg
        .manuscript
        .allowed_extensions
        .iter()
        .any(|ext| ext.trim().is_empty() || ext.contains('/'))
    {
        return Err(anyhow!(
            "invalid manuscript extensions: entries must be non-empty and contain no `/`"
        ));
    }
    if cfg.manuscript.sentinel.trim().is_empty() {
        return Err(anyhow!("invalid manuscript sentinel: cannot be empty"));
    }
    if cfg.render.timestamp_format.trim().is_empty() {
        return Err(anyhow!("invalid render timestamp format: cannot be empty"));
    }
    cfg.render.tz()?;
    Ok(())
}

fn resolve_config_path(paths: &ZibPaths) -> PathBuf {
    if let Ok(custom) = env::var("ZIBALDONE_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    paths.home.join("zibaldone.toml")
}

fn merge_file_config(base: &mut ZibConfig, path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: PartialZibConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse config {}: {err}", path.display()))?;
    if let Some(manuscript) = parsed.manuscript {
        base.manuscript = manuscript;
    }
    if let Some(render) = parsed.render {
        base.render = render;
    }
    Ok(())
}

pub fn load_config(paths: &ZibPaths) -> Result<ZibConfig> {
    let mut cfg = ZibConfig::default();
    merge_file_config(&mut cfg, &resolve_config_path(paths))?;

    cfg.manuscript.allowed_extensions = env_or_csv(
        "ZIBALDONE_ALLOWED_EXTENSIONS",
        &cfg.manuscript.allowed_extensions,
    );
    cfg.manuscript.sentinel = env_or_string("ZIBALDONE_SENTINEL", &cfg.manuscript.sentinel);
    cfg.render.timestamp_format = env_or_string(
        "ZIBALDONE_RENDER_TIMESTAMP_FORMAT",
        &cfg.render.timestamp_format,
    );
    cfg.render.timezone = env_or_string("ZIBALDONE_RENDER_TIMEZONE", &cfg.render.timezone);

    validate(&cfg)?;
    Ok(cfg)
}
