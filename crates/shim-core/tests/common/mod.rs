//! Shared fixtures for lifecycle integration tests.

#![allow(dead_code)]

pub mod release_server;

use sha2::{Digest, Sha256};
use shim_core::config::{RetryConfig, ShimConfig};
use shim_core::install_root::InstallRoot;
use shim_core::platform::Platform;
use shim_core::spawn::Detach;
use std::io;
use std::sync::Mutex;

pub use release_server::{start_stalled, ReleaseServer};

/// A shell script that behaves like the application for `--version`.
pub fn fake_binary(version: &str) -> Vec<u8> {
    format!(
        "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then echo '{} (Claude Code)'; exit 0; fi\necho \"claude {} $*\"\n",
        version, version
    )
    .into_bytes()
}

/// A runnable file that answers `--version` as some other program would.
pub fn foreign_binary() -> Vec<u8> {
    b"#!/bin/sh\necho 'Welcome to Node.js v22.3.0.'\n".to_vec()
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

pub fn platform() -> Platform {
    Platform::resolve("linux", "x86_64", false).unwrap()
}

/// Publish `version` as stable with a binary and a matching manifest.
pub fn publish(server: &ReleaseServer, version: &str) -> Vec<u8> {
    let body = fake_binary(version);
    publish_with_manifest(server, version, &body, Some(&sha256_hex(&body)));
    server.put("stable", format!("{}\n", version));
    body
}

pub fn publish_with_manifest(
    server: &ReleaseServer,
    version: &str,
    body: &[u8],
    checksum: Option<&str>,
) {
    let key = platform().key();
    server.put(&format!("{}/{}/claude", version, key), body.to_vec());
    match checksum {
        Some(c) => server.put(
            &format!("{}/manifest.json", version),
            format!(
                r#"{{"version":"{}","platforms":{{"{}":{{"checksum":"{}","size":{}}}}}}}"#,
                version,
                key,
                c,
                body.len()
            ),
        ),
        None => server.remove(&format!("{}/manifest.json", version)),
    }
}

pub fn config(server: &ReleaseServer) -> ShimConfig {
    ShimConfig {
        base_url: server.base_url().to_string(),
        binary_name: "claude".into(),
        validate_timeout_secs: 10,
        retry: Some(RetryConfig {
            max_attempts: 2,
            base_delay_secs: 0.01,
            max_delay_secs: 1,
        }),
        ..ShimConfig::default()
    }
}

pub fn root_in(dir: &std::path::Path) -> InstallRoot {
    InstallRoot::new(dir.join("claude-code"), "claude")
}

/// Records requested background updates instead of starting processes.
#[derive(Default)]
pub struct RecordingSpawner {
    pub spawned: Mutex<Vec<String>>,
}

impl RecordingSpawner {
    pub fn spawned(&self) -> Vec<String> {
        self.spawned.lock().unwrap().clone()
    }
}

impl Detach for RecordingSpawner {
    fn spawn_update(&self, version: &str) -> io::Result<()> {
        self.spawned.lock().unwrap().push(version.to_string());
        Ok(())
    }
}
