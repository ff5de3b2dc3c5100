use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use claude_statusline::app;
use claude_statusline::cli::{Cli, Commands};
use claude_statusline::config::StatuslineConfig;
use claude_statusline::util::setup_tracing;

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("claude-statusline error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<u8> {
    setup_tracing();
    let cli = Cli::parse();
    let config = StatuslineConfig::from_env();

    match cli.command {
        Some(Commands::Status) => {
            app::print_status(&config)?;
            Ok(0)
        }
        Some(Commands::Doctor) => app::doctor(&config),
        None => {
            app::render_statusline(&config, !cli.no_usage)?;
            Ok(0)
        }
    }
}
