use anyhow::Result;
use std::env;

use crate::commands::CommandReport;
use crate::zib::audit::read_events;
use crate::zib::config::load_config;
use crate::zib::paths::resolve_paths;
use crate::zib::store::{JsonStore, RecordStore};

mod generated {
    include!(concat!(env!("OUT_DIR"), "/env_allowlist.rs"));
}

/// `ZIBALDONE_*` keys set in `vars` that the binary never reads.
pub fn unknown_env_keys<I>(vars: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out = vars
        .into_iter()
        .filter(|key| key.starts_with("ZIBALDONE_"))
        .filter(|key| !generated::GENERATED_ENV_ALLOWLIST.contains(&key.as_str()))
        .collect::<Vec<_>>();
    out.sort();
    out
}

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("home={}", paths.home.display()));
    report.detail(format!("repo_dir={}", paths.repo_dir.display()));
    report.detail(format!("state_dir={}", paths.state_dir.display()));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));
    report.detail(format!("build_uuid={}", env!("BUILD_UUID")));

    match load_config(&paths) {
        Ok(cfg) => {
            report.detail(format!(
                "allowed_extensions={}",
                cfg.manuscript.allowed_extensions.join(",")
            ));
            report.detail(format!("sentinel={}", cfg.manuscript.sentinel));
            report.detail(format!("render_timezone={}", cfg.render.timezone));
        }
        Err(err) => report.issue(format!("config invalid: {err:#}")),
    }

    if !paths.repo_dir.exists() {
        report.issue(format!(
            "missing books dir ({}); created by the first book-create",
            paths.repo_dir.display()
        ));
    }

    let store_file = paths.store_file();
    if store_file.exists() {
        let store = JsonStore::new(&store_file);
        report.detail(format!("store_file={}", store.path().display()));
        match store.books() {
            Ok(books) => report.detail(format!("books={}", books.len())),
            Err(err) => report.issue(format!("store unreadable: {err:#}")),
        }
    } else {
        report.detail("books=0");
    }

    match read_events(&paths) {
        Ok(events) => {
            if let Some(last) = events.last() {
                report.detail(format!(
                    "last_event={} {} at {}",
                    last.phase, last.status, last.at_epoch_secs
                ));
            }
        }
        Err(err) => report.issue(format!("audit log unreadable: {err:#}")),
    }

    for key in unknown_env_keys(env::vars().map(|(k, _)| k)) {
        report.issue(format!("unknown environment variable {key}"));
    }

    Ok(report)
}
