use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One rate-limit window as reported by the quota endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UsageLimit {
    /// Percent of the window already consumed (0-100). `null` reads as 0.
    #[serde(default, deserialize_with = "null_as_zero")]
    pub utilization: f64,
    #[serde(default)]
    pub resets_at: Option<String>,
}

impl UsageLimit {
    pub fn resets_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.resets_at.as_deref()?.trim();
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }
}

fn null_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UsageSnapshot {
    #[serde(default)]
    pub five_hour: Option<UsageLimit>,
    #[serde(default)]
    pub seven_day: Option<UsageLimit>,
    #[serde(default)]
    pub seven_day_opus: Option<UsageLimit>,
}

/// The on-disk cache entry: the last successful fetch and when it happened.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheRecord {
    pub fetched_at: DateTime<Utc>,
    pub usage: UsageSnapshot,
}

impl CacheRecord {
    pub fn new(usage: UsageSnapshot) -> Self {
        Self {
            fetched_at: Utc::now(),
            usage,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.fetched_at)
    }
}
