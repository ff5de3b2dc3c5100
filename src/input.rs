use std::io::Read;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Session description Claude Code pipes to the status line command.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SessionInput {
    pub model: ModelInfo,
    pub context_window: ContextWindow,
    pub cost: Option<SessionCost>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ModelInfo {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ContextWindow {
    pub context_window_size: u64,
    pub used_percentage: f64,
    pub current_usage: Option<CurrentUsage>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CurrentUsage {
    pub input_tokens: u64,
    pub cache_creation_input_tokens: u64,
    pub cache_read_input_tokens: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SessionCost {
    pub total_cost_usd: f64,
    pub total_duration_ms: u64,
}

impl SessionInput {
    /// Context window usage on a 0-100 scale.
    ///
    /// `used_percentage` is reported either as a fraction or as a percent;
    /// anything above 1.0 is taken to be a percent already.
    pub fn context_percentage(&self) -> f64 {
        let window = &self.context_window;
        if window.used_percentage > 0.0 {
            if window.used_percentage > 1.0 {
                return window.used_percentage;
            }
            return window.used_percentage * 100.0;
        }

        if let Some(usage) = &window.current_usage
            && window.context_window_size > 0
        {
            let tokens = usage.input_tokens
                + usage.cache_creation_input_tokens
                + usage.cache_read_input_tokens;
            return tokens as f64 / window.context_window_size as f64 * 100.0;
        }

        0.0
    }

    pub fn cost_usd(&self) -> f64 {
        self.cost.as_ref().map(|cost| cost.total_cost_usd).unwrap_or(0.0)
    }
}

/// Reads the session JSON from `reader`.
///
/// An interactive terminal or an empty pipe yields `None`.
pub fn read_session_input(
    mut reader: impl Read,
    is_terminal: bool,
) -> Result<Option<SessionInput>> {
    if is_terminal {
        return Ok(None);
    }

    let mut raw = Vec::new();
    reader
        .read_to_end(&mut raw)
        .context("failed to read stdin")?;
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let input = serde_json::from_slice(&raw).context("failed to parse Claude Code input JSON")?;
    Ok(Some(input))
}
