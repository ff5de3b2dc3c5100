//! Claude usage quotas: OAuth token lookup, the quota API client, and the
//! on-disk cache that keeps the status line populated when the API is away.

mod cache;
mod client;
mod credentials;
mod service;
mod types;

pub use cache::{CacheReadError, CacheStore, CacheWriteError};
pub use client::{FetchError, HttpUsageClient, UsageFetcher};
pub use credentials::{CredentialLocator, CredentialsError};
pub use service::{UsageError, UsageOrigin, UsageReport, UsageService, UsageWarning, format_age};
pub use types::{CacheRecord, UsageLimit, UsageSnapshot};
