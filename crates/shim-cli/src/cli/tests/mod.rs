//! Argument routing tests.

use super::ShimCommand;
use std::ffi::OsString;

fn parse(args: &[&str]) -> Result<ShimCommand, clap::Error> {
    ShimCommand::from_args(args.iter().map(OsString::from).collect())
}

fn os(args: &[&str]) -> Vec<OsString> {
    args.iter().map(OsString::from).collect()
}

mod reserved;
