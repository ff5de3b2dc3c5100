use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::config::CREDENTIALS_FILE_NAME;

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("cannot find claude directory: set CLAUDE_CONFIG_DIR or ensure home directory is accessible")]
    ConfigDirUnresolvable,
    #[error("cannot read credentials at {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot parse credentials at {}: {source}", path.display())]
    Unparseable {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no OAuth token found")]
    Empty,
}

#[derive(Deserialize)]
struct CredentialsFile {
    #[serde(rename = "claudeAiOauth")]
    claude_ai_oauth: Option<OAuthEntry>,
}

#[derive(Deserialize)]
struct OAuthEntry {
    #[serde(rename = "accessToken", default)]
    access_token: Option<String>,
}

/// Reads the OAuth token Claude Code keeps in its configuration directory.
///
/// The file is re-read on every call; nothing is cached in memory.
#[derive(Debug, Clone)]
pub struct CredentialLocator {
    config_dir: Option<PathBuf>,
}

impl CredentialLocator {
    pub fn new(config_dir: Option<PathBuf>) -> Self {
        Self { config_dir }
    }

    pub fn credentials_path(&self) -> Result<PathBuf, CredentialsError> {
        self.config_dir
            .as_ref()
            .map(|dir| dir.join(CREDENTIALS_FILE_NAME))
            .ok_or(CredentialsError::ConfigDirUnresolvable)
    }

    pub fn locate_token(&self) -> Result<String, CredentialsError> {
        let path = self.credentials_path()?;
        read_token(&path)
    }
}

fn read_token(path: &Path) -> Result<String, CredentialsError> {
    let raw = fs::read_to_string(path).map_err(|source| CredentialsError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: CredentialsFile =
        serde_json::from_str(&raw).map_err(|source| CredentialsError::Unparseable {
            path: path.to_path_buf(),
            source,
        })?;

    parsed
        .claude_ai_oauth
        .and_then(|oauth| oauth.access_token)
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or(CredentialsError::Empty)
}
