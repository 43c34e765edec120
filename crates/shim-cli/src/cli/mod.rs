//! Argument routing for the launcher.
//!
//! Everything is forwarded verbatim to the wrapped binary unless the first
//! argument is one of the reserved `--shim-*` flags.

mod commands;

use anyhow::Result;
use clap::Parser;
use std::ffi::OsString;

use commands::{run_background_update, run_launch, run_status};

const RESERVED_PREFIX: &str = "--shim-";

/// Reserved launcher flags.
#[derive(Debug, Parser)]
#[command(name = "claude")]
#[command(about = "Self-updating launcher for the Claude Code binary", long_about = None)]
pub struct ShimCli {
    /// Print the launcher version and install status, then exit.
    #[arg(long = "shim-version")]
    pub shim_version: bool,

    /// Stage VERSION for the next run (spawned by the launcher itself).
    #[arg(
        long = "shim-background-update",
        value_name = "VERSION",
        hide = true,
        conflicts_with = "shim_version"
    )]
    pub background_update: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ShimCommand {
    /// Ensure a valid binary and hand off with these arguments.
    Launch(Vec<OsString>),
    Status,
    BackgroundUpdate { version: String },
}

impl ShimCommand {
    /// `args` is the full argv, program name included.
    pub fn from_args(args: Vec<OsString>) -> Result<Self, clap::Error> {
        let reserved = args
            .get(1)
            .and_then(|a| a.to_str())
            .is_some_and(|a| a.starts_with(RESERVED_PREFIX));
        if !reserved {
            return Ok(ShimCommand::Launch(args.into_iter().skip(1).collect()));
        }
        let cli = ShimCli::try_parse_from(args)?;
        Ok(match cli.background_update {
            Some(version) => ShimCommand::BackgroundUpdate { version },
            None if cli.shim_version => ShimCommand::Status,
            None => ShimCommand::Launch(Vec::new()),
        })
    }

    /// Returns the process exit code.
    pub fn run(self) -> Result<i32> {
        match self {
            ShimCommand::Launch(args) => run_launch(&args),
            ShimCommand::Status => run_status(),
            ShimCommand::BackgroundUpdate { version } => Ok(run_background_update(&version)),
        }
    }
}

#[cfg(test)]
mod tests;
