// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::Mode;

/// Command-line arguments for `sequencer`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sequencer",
    version,
    about = "Run pre, main and post tasks from a sequence manifest.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the sequence manifest (TOML).
    ///
    /// Default: `Sequence.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Sequence.toml")]
    pub manifest: String,

    /// Main-phase strategy (chained or fanout), overriding the manifest.
    #[arg(long, value_name = "MODE")]
    pub mode: Option<Mode>,

    /// Abort when no task completes within this long (e.g. "30s"),
    /// overriding the manifest.
    #[arg(long, value_name = "DURATION")]
    pub stall_timeout: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SEQUENCER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the plan, but don't execute any commands.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
