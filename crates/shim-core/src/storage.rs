//! File lifecycle helpers: durable small writes, executable bit, and atomic
//! finalize (rename from a temp name onto the final name).

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use tempfile::{NamedTempFile, TempPath};

/// Mark `path` executable (0755). No-op off Unix.
pub fn set_executable(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// True if `path` is a regular file with an execute bit set.
pub fn is_executable(path: &Path) -> bool {
    let meta = match fs::metadata(path) {
        Ok(m) => m,
        Err(_) => return false,
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    let executable = {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    };
    #[cfg(not(unix))]
    let executable = true;
    executable
}

/// Write `contents` and fsync before returning.
pub fn write_durable(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut f = File::create(path)?;
    f.write_all(contents)?;
    f.sync_all()
}

/// Replace `path` atomically: write a sibling temp file, fsync, rename over.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::Builder::new().prefix(".tmp-").tempfile_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Make directory entries (renames, creations) durable. Best effort off Unix.
pub fn sync_dir(dir: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        File::open(dir)?.sync_all()?;
    }
    #[cfg(not(unix))]
    let _ = dir;
    Ok(())
}

/// Flush a finished download, close it and mark it executable. The file
/// keeps its temp name (and is deleted on drop) until [`persist`] is called.
/// Closing first matters: exec of a file still open for writing fails.
pub fn seal_executable(temp: NamedTempFile) -> io::Result<TempPath> {
    temp.as_file().sync_all()?;
    let path = temp.into_temp_path();
    set_executable(&path)?;
    Ok(path)
}

/// Rename a sealed temp file onto `final_path`. Observers of `final_path`
/// see either the old file or the complete new one.
pub fn persist(path: TempPath, final_path: &Path) -> io::Result<()> {
    path.persist(final_path).map_err(|e| e.error)?;
    if let Some(dir) = final_path.parent() {
        sync_dir(dir)?;
    }
    Ok(())
}

/// Remove a file, treating "already gone" as success.
pub fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Remove a directory tree, treating "already gone" as success.
pub fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sealed_download_replaces_by_rename() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("claude");
        fs::write(&final_path, b"old").unwrap();

        let mut temp = NamedTempFile::new_in(dir.path()).unwrap();
        temp.write_all(b"new contents").unwrap();
        let temp_path = temp.path().to_path_buf();
        let sealed = seal_executable(temp).unwrap();
        assert_eq!(fs::read(&final_path).unwrap(), b"old");
        persist(sealed, &final_path).unwrap();

        assert!(!temp_path.exists());
        assert_eq!(fs::read(&final_path).unwrap(), b"new contents");
        #[cfg(unix)]
        assert!(is_executable(&final_path));
    }

    #[test]
    fn dropped_seal_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let temp = NamedTempFile::new_in(dir.path()).unwrap();
        drop(seal_executable(temp).unwrap());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn write_atomic_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join(".version");
        write_atomic(&p, b"1.0.0").unwrap();
        write_atomic(&p, b"1.0.1").unwrap();
        assert_eq!(fs::read_to_string(&p).unwrap(), "1.0.1");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn removals_tolerate_missing() {
        let dir = tempfile::tempdir().unwrap();
        remove_file_if_exists(&dir.path().join("absent")).unwrap();
        remove_dir_if_exists(&dir.path().join("absent-dir")).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn is_executable_checks_mode() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("tool");
        fs::write(&p, b"#!/bin/sh\n").unwrap();
        assert!(!is_executable(&p));
        set_executable(&p).unwrap();
        assert!(is_executable(&p));
        assert!(!is_executable(dir.path()));
    }
}
