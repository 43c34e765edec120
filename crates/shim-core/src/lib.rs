pub mod config;
pub mod logging;

pub mod checksum;
pub mod fetch;
pub mod handoff;
pub mod install_root;
pub mod lifecycle;
pub mod location;
pub mod markers;
pub mod oracle;
pub mod platform;
pub mod retry;
pub mod spawn;
pub mod staging;
pub mod status;
pub mod storage;
pub mod validate;
