//! Install root selection.
//!
//! Candidates, first match wins:
//! 1. `~/.claude/cache/claude-code` if `~/.claude` exists and the target is writable
//! 2. `~/.cache/claude-code` if `~/.cache` exists and the target is writable
//! 3. `<prefix>/opt/claude-code`, always
//!
//! Only existence and permission checks happen here; nothing is created. A
//! bind-mounted `~/.claude` therefore takes priority without configuration.

use std::io;
use std::path::{Path, PathBuf};

/// Directory name owned by the launcher under each candidate.
pub const APP_DIR: &str = "claude-code";

/// Environment-scoped prefix consulted for the last-resort root.
pub const PREFIX_ENV: &str = "CONDA_PREFIX";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootSource {
    ClaudeHome,
    UserCache,
    Prefix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub root: PathBuf,
    pub source: RootSource,
}

/// The only environment the selector looks at.
#[derive(Debug, Clone)]
pub struct LocationInputs {
    pub home: Option<PathBuf>,
    pub prefix: PathBuf,
}

impl LocationInputs {
    /// `HOME` (or `USERPROFILE` on Windows) and `CONDA_PREFIX`. Without a
    /// prefix variable, the launcher's own prefix is used: `<prefix>/bin/claude`.
    pub fn from_env() -> io::Result<Self> {
        let home = home_dir();
        let prefix = match std::env::var_os(PREFIX_ENV).filter(|p| !p.is_empty()) {
            Some(p) => PathBuf::from(p),
            None => prefix_of_exe(&std::env::current_exe()?),
        };
        Ok(Self { home, prefix })
    }
}

fn home_dir() -> Option<PathBuf> {
    let var = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
    std::env::var_os(var)
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}

fn prefix_of_exe(exe: &Path) -> PathBuf {
    let exe = exe.canonicalize().unwrap_or_else(|_| exe.to_path_buf());
    exe.parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Pick the install root for this invocation.
pub fn select(inputs: &LocationInputs) -> Selection {
    if let Some(home) = &inputs.home {
        let candidates = [
            (
                home.join(".claude"),
                home.join(".claude").join("cache").join(APP_DIR),
                RootSource::ClaudeHome,
            ),
            (home.join(".cache"), home.join(".cache").join(APP_DIR), RootSource::UserCache),
        ];
        for (anchor, root, source) in candidates {
            if anchor.is_dir() && writable_target(&anchor, &root) {
                tracing::debug!(root = %root.display(), ?source, "install root selected");
                return Selection { root, source };
            }
            tracing::trace!(anchor = %anchor.display(), "install root candidate rejected");
        }
    }
    let root = inputs.prefix.join("opt").join(APP_DIR);
    tracing::debug!(root = %root.display(), "falling back to prefix install root");
    Selection {
        root,
        source: RootSource::Prefix,
    }
}

/// Test `root` itself if it exists, else its nearest existing ancestor up to `anchor`.
fn writable_target(anchor: &Path, root: &Path) -> bool {
    let mut probe = root;
    while !probe.exists() {
        if probe == anchor {
            return false;
        }
        match probe.parent() {
            Some(p) => probe = p,
            None => return false,
        }
    }
    probe.is_dir() && is_writable(probe)
}

#[cfg(unix)]
fn is_writable(dir: &Path) -> bool {
    use std::os::unix::ffi::OsStrExt;
    let c_path = match std::ffi::CString::new(dir.as_os_str().as_bytes()) {
        Ok(c) => c,
        Err(_) => return false,
    };
    // SAFETY: `c_path` is a valid NUL-terminated string for the duration of the call.
    unsafe { libc::access(c_path.as_ptr(), libc::W_OK) == 0 }
}

#[cfg(not(unix))]
fn is_writable(dir: &Path) -> bool {
    std::fs::metadata(dir)
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn inputs(home: &Path, prefix: &Path) -> LocationInputs {
        LocationInputs {
            home: Some(home.to_path_buf()),
            prefix: prefix.to_path_buf(),
        }
    }

    #[test]
    fn claude_home_beats_user_cache() {
        let home = tempfile::tempdir().unwrap();
        let prefix = tempfile::tempdir().unwrap();
        fs::create_dir(home.path().join(".claude")).unwrap();
        fs::create_dir(home.path().join(".cache")).unwrap();
        let sel = select(&inputs(home.path(), prefix.path()));
        assert_eq!(sel.source, RootSource::ClaudeHome);
        assert!(sel.root.ends_with(".claude/cache/claude-code"));
        assert!(!sel.root.exists(), "selection must not create directories");
    }

    #[test]
    fn user_cache_when_no_claude_home() {
        let home = tempfile::tempdir().unwrap();
        let prefix = tempfile::tempdir().unwrap();
        fs::create_dir(home.path().join(".cache")).unwrap();
        let sel = select(&inputs(home.path(), prefix.path()));
        assert_eq!(sel.source, RootSource::UserCache);
        assert!(sel.root.ends_with(".cache/claude-code"));
    }

    #[test]
    fn prefix_when_neither_exists() {
        let home = tempfile::tempdir().unwrap();
        let prefix = tempfile::tempdir().unwrap();
        let sel = select(&inputs(home.path(), prefix.path()));
        assert_eq!(sel.source, RootSource::Prefix);
        assert_eq!(sel.root, prefix.path().join("opt").join("claude-code"));
    }

    #[test]
    fn no_home_goes_to_prefix() {
        let prefix = tempfile::tempdir().unwrap();
        let sel = select(&LocationInputs {
            home: None,
            prefix: prefix.path().to_path_buf(),
        });
        assert_eq!(sel.source, RootSource::Prefix);
    }

    #[test]
    fn claude_home_that_is_a_file_is_skipped() {
        let home = tempfile::tempdir().unwrap();
        let prefix = tempfile::tempdir().unwrap();
        fs::write(home.path().join(".claude"), b"not a dir").unwrap();
        fs::create_dir(home.path().join(".cache")).unwrap();
        let sel = select(&inputs(home.path(), prefix.path()));
        assert_eq!(sel.source, RootSource::UserCache);
    }

    #[cfg(unix)]
    #[test]
    fn read_only_claude_home_is_skipped() {
        use std::os::unix::fs::PermissionsExt;
        // root ignores permission bits
        if unsafe { libc::geteuid() } == 0 {
            return;
        }
        let home = tempfile::tempdir().unwrap();
        let prefix = tempfile::tempdir().unwrap();
        let claude = home.path().join(".claude");
        fs::create_dir(&claude).unwrap();
        fs::set_permissions(&claude, fs::Permissions::from_mode(0o555)).unwrap();
        fs::create_dir(home.path().join(".cache")).unwrap();
        let sel = select(&inputs(home.path(), prefix.path()));
        fs::set_permissions(&claude, fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(sel.source, RootSource::UserCache);
    }

    #[test]
    fn prefix_of_exe_strips_bin() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir(&bin).unwrap();
        fs::write(bin.join("claude"), b"").unwrap();
        let prefix = prefix_of_exe(&bin.join("claude"));
        assert_eq!(prefix, dir.path().canonicalize().unwrap());
    }
}
