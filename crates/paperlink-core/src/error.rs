use std::path::PathBuf;

use thiserror::Error;

/// All errors that can occur in paperlink-core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Required file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Malformed dump file {}: {reason}", path.display())]
    MalformedDump { path: PathBuf, reason: String },

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Exit codes used by the `paperlink` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    GeneralError = 1,
    NotFound = 2,
    Incomplete = 7,
}

pub type Result<T> = std::result::Result<T, CoreError>;
