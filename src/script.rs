// Session scripts: TOML files describing the test cases to replay

use crate::diagnostics::Outcome;
use crate::error::{DriverError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CaseConfig {
    #[serde(default)]
    pub suite: Option<String>,

    pub function: String,

    pub outcome: Outcome,

    #[serde(default)]
    pub message: String,

    // xfail only
    #[serde(default)]
    pub expect_message: String,

    #[serde(default)]
    pub optional: bool,

    // Plain log lines emitted before the outcome
    #[serde(default)]
    pub messages: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct SessionScript {
    #[serde(default)]
    pub cases: Vec<CaseConfig>,

    #[serde(default)]
    pub snapshot_log: bool,
}

impl SessionScript {
    pub fn from_toml(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

pub async fn load_script(path: &Path) -> Result<SessionScript> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| DriverError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    SessionScript::from_toml(&text).map_err(|source| DriverError::ScriptParse {
        path: path.to_path_buf(),
        source,
    })
}

/// `cases.toml` -> `cases.log.approved.txt`
pub fn approved_log_path(script_path: &Path) -> PathBuf {
    script_path.with_extension("log.approved.txt")
}
