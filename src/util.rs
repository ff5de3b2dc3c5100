use chrono::{DateTime, Utc};
use tracing_subscriber::{EnvFilter, fmt};

/// Logs go to stderr; stdout is reserved for the status line itself.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

pub fn format_cost(cost_usd: f64) -> String {
    if !cost_usd.is_finite() || cost_usd <= 0.0 {
        return "$0.00".to_string();
    }
    if cost_usd < 0.01 {
        format!("${cost_usd:.4}")
    } else if cost_usd < 1.0 {
        format!("${cost_usd:.3}")
    } else {
        format!("${cost_usd:.2}")
    }
}

/// Compact countdown to a quota reset, `None` when the reset time is unknown.
pub fn format_time_remaining(target: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<String> {
    let target = target?;
    if target <= now {
        return Some("0m".to_string());
    }

    let secs = (target - now).num_seconds();
    let hours = secs / 3_600;
    let minutes = (secs % 3_600) / 60;
    if hours > 0 {
        Some(format!("{hours}h{minutes}m"))
    } else {
        Some(format!("{minutes}m"))
    }
}

pub fn shorten_model_name(display_name: &str) -> String {
    match display_name {
        "Claude Opus 4.5" => "Opus 4.5".to_string(),
        "Claude Sonnet 4.5" => "Sonnet 4.5".to_string(),
        "Claude Sonnet 4" => "Sonnet 4".to_string(),
        "Claude Haiku 4.5" => "Haiku 4.5".to_string(),
        other => truncate_chars(other, 12),
    }
}

pub fn truncate_chars(input: &str, max_chars: usize) -> String {
    input.chars().take(max_chars).collect()
}
