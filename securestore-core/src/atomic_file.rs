//! Whole-file replacement for small files holding secrets or ciphertext.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Replaces `path` with `contents`.
///
/// The data goes to a `.tmp` sibling that is created readable by the owner
/// only on Unix, then renamed over `path`. The temporary file is removed if
/// any step fails. Missing parent directories are created.
pub fn write_owner_only(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = temp_path(path);
    let result = write_new(&temp_path, contents).and_then(|()| fs::rename(&temp_path, path));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_new(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    // a stale temp file keeps its old mode, so start from a fresh one
    if let Err(err) = fs::remove_file(path) {
        if err.kind() != io::ErrorKind::NotFound {
            return Err(err);
        }
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_contents_without_leftovers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("entries.json");

        write_owner_only(&path, b"first").expect("write");
        write_owner_only(&path, b"second").expect("rewrite");

        assert_eq!(fs::read(&path).expect("read"), b"second");
        assert!(!temp_path(&path).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_created_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("key.pem");
        fs::write(temp_path(&path), b"stale").expect("stale temp");
        fs::set_permissions(temp_path(&path), fs::Permissions::from_mode(0o644))
            .expect("chmod");

        write_owner_only(&path, b"secret").expect("write");
        let mode = fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("occupied");
        fs::create_dir(&path).expect("dir");
        fs::write(path.join("child"), b"x").expect("child");

        assert!(write_owner_only(&path, b"data").is_err());
        assert!(!temp_path(&path).exists());
    }
}
