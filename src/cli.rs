use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "claude-statusline",
    version,
    about = "Print a one-line Claude Code status summary with cached usage quotas"
)]
pub struct Cli {
    /// Skip the usage quota lookup and render session data only.
    #[arg(long)]
    pub no_usage: bool,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print where credentials and the usage cache live and how old the cache is.
    Status,
    /// Check credentials and the usage cache for problems.
    Doctor,
}
