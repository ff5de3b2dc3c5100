//! On-disk cache of the last successful usage fetch.
//!
//! Writes go to a temporary file in the cache's own directory and are renamed
//! over the final path, so readers only ever observe a complete record.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile};
use thiserror::Error;
use tracing::debug;

use super::types::{CacheRecord, UsageSnapshot};

const TEMP_PREFIX: &str = ".statusline-cache-";
const TEMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Error)]
pub enum CacheReadError {
    #[error("no cached usage at {}", path.display())]
    NotFound { path: PathBuf },
    #[error("cannot read usage cache {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot parse usage cache {}: {source}", path.display())]
    Unparseable {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum CacheWriteError {
    #[error("failed to serialize usage cache: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to create temp file in {}: {source}", dir.display())]
    TempFileCreate {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write temp file: {0}")]
    Write(#[source] io::Error),
    #[error("failed to set cache permissions: {0}")]
    Chmod(#[source] io::Error),
    #[error("failed to rename cache file into {}: {source}", path.display())]
    Rename {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<CacheRecord, CacheReadError> {
        let raw = fs::read(&self.path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                CacheReadError::NotFound {
                    path: self.path.clone(),
                }
            } else {
                CacheReadError::Unreadable {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;
        serde_json::from_slice(&raw).map_err(|source| CacheReadError::Unparseable {
            path: self.path.clone(),
            source,
        })
    }

    /// Stamps `usage` with the current time and publishes it.
    pub fn save(&self, usage: &UsageSnapshot) -> Result<CacheRecord, CacheWriteError> {
        let record = CacheRecord::new(usage.clone());
        self.save_record(&record)?;
        Ok(record)
    }

    pub fn save_record(&self, record: &CacheRecord) -> Result<(), CacheWriteError> {
        let data = serde_json::to_vec(record).map_err(CacheWriteError::Serialize)?;
        let staged = self.stage(&data)?;
        self.publish(staged)
    }

    /// Writes `data` to a private temp file next to the cache path.
    ///
    /// Dropping the returned file without publishing it deletes it.
    fn stage(&self, data: &[u8]) -> Result<NamedTempFile, CacheWriteError> {
        let dir = cache_dir(&self.path);
        let mut temp = Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(&dir)
            .map_err(|source| CacheWriteError::TempFileCreate {
                dir: dir.clone(),
                source,
            })?;

        temp.write_all(data).map_err(CacheWriteError::Write)?;
        temp.as_file().sync_all().map_err(CacheWriteError::Write)?;
        restrict_permissions(temp.as_file()).map_err(CacheWriteError::Chmod)?;
        Ok(temp)
    }

    fn publish(&self, staged: NamedTempFile) -> Result<(), CacheWriteError> {
        staged
            .persist(&self.path)
            .map_err(|err| CacheWriteError::Rename {
                path: self.path.clone(),
                source: err.error,
            })?;
        debug!(path = %self.path.display(), "usage cache published");
        Ok(())
    }
}

fn cache_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(unix)]
fn restrict_permissions(file: &fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &fs::File) -> io::Result<()> {
    Ok(())
}
