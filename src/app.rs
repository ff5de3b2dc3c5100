use std::io::{self, IsTerminal};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::config::StatuslineConfig;
use crate::input::{SessionInput, read_session_input};
use crate::render::{LineData, render_line};
use crate::usage::{
    CacheReadError, CacheStore, CredentialLocator, HttpUsageClient, UsageFetcher, UsageService,
    format_age,
};

pub fn render_statusline(config: &StatuslineConfig, with_usage: bool) -> Result<()> {
    let stdin = io::stdin();
    let is_terminal = stdin.is_terminal();
    let session = match read_session_input(stdin.lock(), is_terminal) {
        Ok(session) => session,
        Err(err) => {
            warn!("failed to read Claude Code input: {err:#}");
            None
        }
    };

    let line = if with_usage {
        let service = UsageService::from_config(config);
        build_line(session.as_ref(), Some(&service), Utc::now())
    } else {
        build_line::<HttpUsageClient>(session.as_ref(), None, Utc::now())
    };
    println!("{line}");
    Ok(())
}

/// Resolves usage through `service` (when given) and renders the line.
pub fn build_line<F: UsageFetcher>(
    session: Option<&SessionInput>,
    service: Option<&UsageService<F>>,
    now: DateTime<Utc>,
) -> String {
    let outcome = service.map(UsageService::get_usage);
    let (report, error) = match &outcome {
        Some(Ok(report)) => (Some(report), None),
        Some(Err(err)) => (None, Some(err.to_string())),
        None => (None, None),
    };

    render_line(
        &LineData {
            session,
            usage: report.map(|report| &report.usage),
            fetched_at: report.map(|report| report.fetched_at),
            usage_error: error.as_deref(),
        },
        now,
    )
}

pub fn print_status(config: &StatuslineConfig) -> Result<()> {
    println!("claude-statusline status");
    match &config.config_dir {
        Some(dir) => println!("config_dir: {}", dir.display()),
        None => println!("config_dir: unresolved"),
    }

    let locator = CredentialLocator::new(config.config_dir.clone());
    match locator.locate_token() {
        Ok(_) => println!("credentials: found"),
        Err(err) => println!("credentials: unavailable ({err})"),
    }

    let store = CacheStore::new(config.cache_path.clone());
    println!("cache: {}", store.path().display());
    match store.load() {
        Ok(record) => {
            let age = record.age(Utc::now()).to_std().unwrap_or_default();
            let freshness = if age < config.cache_ttl { "fresh" } else { "stale" };
            println!("cache_age: {} ({freshness})", format_age(age));
            println!("cache_fetched_at: {}", record.fetched_at.to_rfc3339());
        }
        Err(CacheReadError::NotFound { .. }) => println!("cache_age: n/a"),
        Err(err) => println!("cache_age: unreadable ({err})"),
    }
    println!("cache_ttl: {}s", config.cache_ttl.as_secs());
    println!("fetch_timeout: {}s", config.timeout.as_secs());
    Ok(())
}

pub fn doctor(config: &StatuslineConfig) -> Result<u8> {
    let mut issues = 0u8;

    println!("claude-statusline doctor");
    match &config.config_dir {
        Some(dir) if dir.is_dir() => println!("[OK] Config directory {} exists.", dir.display()),
        Some(dir) => {
            issues += 1;
            println!("[WARN] Config directory {} does not exist.", dir.display());
        }
        None => {
            issues += 1;
            println!("[WARN] Config directory unresolved; set CLAUDE_CONFIG_DIR.");
        }
    }

    match CredentialLocator::new(config.config_dir.clone()).locate_token() {
        Ok(_) => println!("[OK] OAuth token available."),
        Err(err) => {
            issues += 1;
            println!("[WARN] OAuth token unavailable: {err}");
        }
    }

    match CacheStore::new(config.cache_path.clone()).load() {
        Ok(record) => println!(
            "[OK] Usage cache readable (fetched {} ago).",
            format_age(record.age(Utc::now()).to_std().unwrap_or_default())
        ),
        Err(CacheReadError::NotFound { .. }) => {
            println!("[INFO] No usage cache yet; it is written after the first successful fetch.")
        }
        Err(err) => {
            issues += 1;
            println!("[WARN] {err}");
        }
    }

    if issues == 0 {
        println!("Doctor: healthy");
        Ok(0)
    } else {
        println!("Doctor: {issues} issue(s) found");
        Ok(1)
    }
}
