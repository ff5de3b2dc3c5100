use chrono::{DateTime, Local, Utc};

use crate::input::SessionInput;
use crate::usage::UsageSnapshot;
use crate::util::{format_cost, format_time_remaining, shorten_model_name};

const FALLBACK_LINE: &str = "Claude Statusline";

/// Everything one status line is built from.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineData<'a> {
    pub session: Option<&'a SessionInput>,
    pub usage: Option<&'a UsageSnapshot>,
    pub fetched_at: Option<DateTime<Utc>>,
    /// Shown only when nothing else could be rendered.
    pub usage_error: Option<&'a str>,
}

pub fn render_line(data: &LineData<'_>, now: DateTime<Utc>) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(session) = data.session
        && !session.model.display_name.is_empty()
    {
        parts.push(shorten_model_name(&session.model.display_name));
    }

    if let Some(usage) = data.usage {
        if let Some(five_hour) = &usage.five_hour {
            match format_time_remaining(five_hour.resets_at_utc(), now) {
                Some(remaining) => parts.push(format!(
                    "5h: {:.0}% ({remaining})",
                    five_hour.utilization
                )),
                None => parts.push(format!("5h: {:.0}%", five_hour.utilization)),
            }
        }
        if let Some(seven_day) = &usage.seven_day {
            parts.push(format!("7d: {:.0}%", seven_day.utilization));
        }
        if let Some(opus) = &usage.seven_day_opus
            && opus.utilization > 0.0
        {
            parts.push(format!("Opus: {:.0}%", opus.utilization));
        }
    }

    if let Some(session) = data.session {
        let context = session.context_percentage();
        if context > 0.0 {
            parts.push(format!("Ctx: {context:.0}%"));
        }
        let cost = session.cost_usd();
        if cost > 0.0 {
            parts.push(format_cost(cost));
        }
    }

    if let Some(fetched_at) = data.fetched_at {
        parts.push(format!(
            "@{}",
            fetched_at.with_timezone(&Local).format("%H:%M")
        ));
    }

    if parts.is_empty() {
        return match data.usage_error {
            Some(err) => format!("⚠ {err}"),
            None => FALLBACK_LINE.to_string(),
        };
    }

    parts.join(" | ")
}
