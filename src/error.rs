use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZibError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("path escapes content root: {0}")]
    PathEscape(String),
    #[error("{op} failed for {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("lock unavailable: {0}")]
    Locked(String),
    #[error("store file invalid or unreadable: {0}")]
    StoreCorrupt(String),
}

impl ZibError {
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    pub fn code(&self) -> ZibErrorCode {
        match self {
            Self::Validation(_) => ZibErrorCode::E001Validation,
            Self::NotFound(_) => ZibErrorCode::E002NotFound,
            Self::PathEscape(_) => ZibErrorCode::E003PathEscape,
            Self::Io { .. } => ZibErrorCode::E004Io,
            Self::Locked(_) => ZibErrorCode::E005Locked,
            Self::StoreCorrupt(_) => ZibErrorCode::E006StoreCorrupt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZibErrorCode {
    E001Validation,
    E002NotFound,
    E003PathEscape,
    E004Io,
    E005Locked,
    E006StoreCorrupt,
}

impl ZibErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::E001Validation => "E001_VALIDATION",
            Self::E002NotFound => "E002_NOT_FOUND",
            Self::E003PathEscape => "E003_PATH_ESCAPE",
            Self::E004Io => "E004_IO",
            Self::E005Locked => "E005_LOCKED",
            Self::E006StoreCorrupt => "E006_STORE_CORRUPT",
        }
    }
}

/// Finds the first domain error in an `anyhow` chain.
pub fn domain_error(err: &anyhow::Error) -> Option<&ZibError> {
    err.chain().find_map(|cause| cause.downcast_ref::<ZibError>())
}
