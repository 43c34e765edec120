//! `--shim-*` flags handled by the launcher itself.

use super::parse;
use crate::cli::ShimCommand;

#[test]
fn shim_version() {
    assert_eq!(parse(&["claude", "--shim-version"]).unwrap(), ShimCommand::Status);
}

#[test]
fn background_update_takes_version() {
    assert_eq!(
        parse(&["claude", "--shim-background-update", "2.0.1"]).unwrap(),
        ShimCommand::BackgroundUpdate {
            version: "2.0.1".into()
        }
    );
}

#[test]
fn background_update_requires_version() {
    assert!(parse(&["claude", "--shim-background-update"]).is_err());
}

#[test]
fn unknown_reserved_flag_is_an_error() {
    assert!(parse(&["claude", "--shim-bogus"]).is_err());
}

#[test]
fn reserved_flags_conflict() {
    assert!(parse(&["claude", "--shim-version", "--shim-background-update", "1.0.0"]).is_err());
}
