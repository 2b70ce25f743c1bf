//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised before the configuration can be validated at all.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file `{0}` is not valid JSON")]
    Json(PathBuf, #[source] serde_json::Error),

    #[error("Config file `{0}` must contain a JSON object")]
    NotAnObject(PathBuf),
}
