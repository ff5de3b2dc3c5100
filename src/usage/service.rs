use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use super::cache::{CacheReadError, CacheStore, CacheWriteError};
use super::client::{FetchError, HttpUsageClient, UsageFetcher};
use super::credentials::{CredentialLocator, CredentialsError};
use super::types::{CacheRecord, UsageSnapshot};
use crate::config::StatuslineConfig;

/// Failure with no cached data to fall back on.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl UsageError {
    fn label(&self) -> &'static str {
        match self {
            Self::Credentials(_) => "token error",
            Self::Fetch(_) => "API error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageOrigin {
    FreshCache,
    Fetched,
    StaleCache,
}

#[derive(Debug)]
pub enum UsageWarning {
    StaleFallback { age: Duration, cause: UsageError },
    CacheSaveFailed(CacheWriteError),
}

impl fmt::Display for UsageWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaleFallback { age, cause } => write!(
                f,
                "using cached data from {} ago ({}: {cause})",
                format_age(*age),
                cause.label()
            ),
            Self::CacheSaveFailed(err) => write!(f, "failed to save cache: {err}"),
        }
    }
}

#[derive(Debug)]
pub struct UsageReport {
    pub usage: UsageSnapshot,
    /// When `usage` was fetched from the API.
    pub fetched_at: DateTime<Utc>,
    pub origin: UsageOrigin,
    pub warnings: Vec<UsageWarning>,
}

/// Cache-first usage lookup with a stale fallback.
pub struct UsageService<F = HttpUsageClient> {
    store: CacheStore,
    credentials: CredentialLocator,
    fetcher: F,
    cache_ttl: Duration,
}

impl UsageService<HttpUsageClient> {
    pub fn from_config(config: &StatuslineConfig) -> Self {
        let fetcher = HttpUsageClient::new(config.endpoint.clone(), config.timeout);
        Self::new(config, fetcher)
    }
}

impl<F: UsageFetcher> UsageService<F> {
    pub fn new(config: &StatuslineConfig, fetcher: F) -> Self {
        Self {
            store: CacheStore::new(config.cache_path.clone()),
            credentials: CredentialLocator::new(config.config_dir.clone()),
            fetcher,
            cache_ttl: config.cache_ttl,
        }
    }

    pub fn get_usage(&self) -> Result<UsageReport, UsageError> {
        let now = Utc::now();
        let cached = match self.store.load() {
            Ok(record) => Some(record),
            Err(CacheReadError::NotFound { .. }) => None,
            Err(err) => {
                debug!(error = %err, "ignoring unusable usage cache");
                None
            }
        };

        if let Some(record) = &cached
            && is_fresh(record, now, self.cache_ttl)
        {
            debug!(fetched_at = %record.fetched_at, "usage cache hit");
            return Ok(UsageReport {
                usage: record.usage.clone(),
                fetched_at: record.fetched_at,
                origin: UsageOrigin::FreshCache,
                warnings: Vec::new(),
            });
        }

        let token = match self.credentials.locate_token() {
            Ok(token) => token,
            Err(err) => return fall_back(cached, now, err.into()),
        };

        let usage = match self.fetcher.fetch(&token) {
            Ok(usage) => usage,
            Err(err) => return fall_back(cached, now, err.into()),
        };

        let mut warnings = Vec::new();
        let fetched_at = match self.store.save(&usage) {
            Ok(record) => record.fetched_at,
            Err(err) => {
                let warning = UsageWarning::CacheSaveFailed(err);
                warn!("{warning}");
                warnings.push(warning);
                Utc::now()
            }
        };

        Ok(UsageReport {
            usage,
            fetched_at,
            origin: UsageOrigin::Fetched,
            warnings,
        })
    }
}

fn is_fresh(record: &CacheRecord, now: DateTime<Utc>, ttl: Duration) -> bool {
    // A record stamped in the future (clock skew) counts as fresh.
    match record.age(now).to_std() {
        Ok(age) => age < ttl,
        Err(_) => true,
    }
}

fn fall_back(
    cached: Option<CacheRecord>,
    now: DateTime<Utc>,
    cause: UsageError,
) -> Result<UsageReport, UsageError> {
    let Some(record) = cached else {
        return Err(cause);
    };

    let age = record.age(now).to_std().unwrap_or_default();
    let warning = UsageWarning::StaleFallback { age, cause };
    warn!("{warning}");
    Ok(UsageReport {
        usage: record.usage,
        fetched_at: record.fetched_at,
        origin: UsageOrigin::StaleCache,
        warnings: vec![warning],
    })
}

/// Age rounded to the nearest minute, e.g. `6m` or `2h5m`.
pub fn format_age(age: Duration) -> String {
    let minutes = (age.as_secs() + 30) / 60;
    let hours = minutes / 60;
    if hours > 0 {
        format!("{hours}h{}m", minutes % 60)
    } else {
        format!("{minutes}m")
    }
}
