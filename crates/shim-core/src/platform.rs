//! Host OS / architecture / libc flavor to release platform key.

use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("unsupported platform: {os}/{arch}")]
    Unsupported { os: String, arch: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Darwin,
    Linux,
    Windows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X64,
    Arm64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Libc {
    Gnu,
    Musl,
}

/// A supported release target. Construct with [`Platform::resolve`] or [`Platform::detect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
    pub libc: Libc,
}

impl Platform {
    /// Map raw host identifiers (as in `std::env::consts`) to a platform.
    /// `musl` is only consulted on Linux.
    pub fn resolve(os: &str, arch: &str, musl: bool) -> Result<Self, PlatformError> {
        let unsupported = || PlatformError::Unsupported {
            os: os.to_string(),
            arch: arch.to_string(),
        };
        let os_kind = match os {
            "macos" | "darwin" => Os::Darwin,
            "linux" => Os::Linux,
            "windows" | "win32" => Os::Windows,
            _ => return Err(unsupported()),
        };
        let arch_kind = match arch {
            "x86_64" | "amd64" | "x64" => Arch::X64,
            "aarch64" | "arm64" => Arch::Arm64,
            _ => return Err(unsupported()),
        };
        if os_kind == Os::Windows && arch_kind != Arch::X64 {
            return Err(unsupported());
        }
        let libc = if os_kind == Os::Linux && musl {
            Libc::Musl
        } else {
            Libc::Gnu
        };
        Ok(Self {
            os: os_kind,
            arch: arch_kind,
            libc,
        })
    }

    /// Resolve the platform this process runs on.
    pub fn detect() -> Result<Self, PlatformError> {
        let os = std::env::consts::OS;
        let musl = os == "linux" && musl_present(Path::new("/lib"));
        Self::resolve(os, std::env::consts::ARCH, musl)
    }

    /// Directory name of this platform in the release bucket.
    pub fn key(&self) -> &'static str {
        match (self.os, self.arch, self.libc) {
            (Os::Darwin, Arch::X64, _) => "darwin-x64",
            (Os::Darwin, Arch::Arm64, _) => "darwin-arm64",
            (Os::Linux, Arch::X64, Libc::Gnu) => "linux-x64",
            (Os::Linux, Arch::Arm64, Libc::Gnu) => "linux-arm64",
            (Os::Linux, Arch::X64, Libc::Musl) => "linux-x64-musl",
            (Os::Linux, Arch::Arm64, Libc::Musl) => "linux-arm64-musl",
            (Os::Windows, _, _) => "win32-x64",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Probe `lib_dir` for the musl dynamic loader or libc. Unreadable ⇒ glibc.
pub fn musl_present(lib_dir: &Path) -> bool {
    let entries = match std::fs::read_dir(lib_dir) {
        Ok(e) => e,
        Err(_) => return false,
    };
    entries.flatten().any(|entry| {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        name.starts_with("ld-musl-") || name.starts_with("libc.musl-")
    })
}
