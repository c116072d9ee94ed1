//! CLI argument parsing via clap.

use clap::Parser;
use std::path::PathBuf;

use codebeat::build_info::HELP_BUILD_METADATA;
use codebeat::config::RunMode;

/// Chat with Reka AI from the terminal, with GitHub and Spotify tools.
#[derive(Debug, Parser)]
#[command(name = "codebeat", version, after_help = HELP_BUILD_METADATA)]
pub struct Args {
    /// Message to send. If provided, runs once and exits.
    pub message: Vec<String>,

    /// Conversation behavior.
    #[arg(long = "mode", value_enum, default_value_t = RunMode::Tools)]
    pub mode: RunMode,

    /// Path to config file (default: ./codebeat.toml when present).
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Override model name.
    #[arg(short = 'm', long = "model")]
    pub model: Option<String>,

    /// Override API base URL.
    #[arg(long = "base-url")]
    pub base_url: Option<String>,

    /// Disable color output.
    #[arg(long = "no-color")]
    pub no_color: bool,
}

impl Args {
    /// Positional words joined into one message, if any were given.
    pub fn one_shot_message(&self) -> Option<String> {
        let joined = self.message.join(" ");
        (!joined.trim().is_empty()).then_some(joined)
    }
}
