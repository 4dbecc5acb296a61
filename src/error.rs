// Errors of the script driver. Session operations themselves never fail

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse session script {}: {source}", path.display())]
    ScriptParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to read answer from stdin: {0}")]
    Prompt(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DriverError>;
