//! Crash-safe file replacement.
//!
//! # Invariants
//! - The target path either keeps its previous content or holds the full new
//!   content; a partially written target is never observable.
//! - Temp files live next to the target so the final rename stays on one
//!   filesystem.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Writes `bytes` to a sibling temp file, syncs it, then renames it over `path`.
///
/// Errors from creating the temp file are returned unchanged, so a missing
/// parent directory surfaces as `io::ErrorKind::NotFound`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp_path = temp_sibling(path);
    let written = File::create(&tmp_path).and_then(|mut file| {
        file.write_all(bytes)?;
        file.sync_all()
    });
    if let Err(err) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }

    if let Err(rename_err) = fs::rename(&tmp_path, path) {
        // Cross-device fallback (overlay filesystems, some CI runners).
        let copied = fs::copy(&tmp_path, path);
        let _ = fs::remove_file(&tmp_path);
        if let Err(copy_err) = copied {
            return Err(io::Error::new(
                copy_err.kind(),
                format!(
                    "rename to `{}` failed ({rename_err}), copy fallback failed: {copy_err}",
                    path.display()
                ),
            ));
        }
    }

    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snbackup".to_string());
    path.with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()))
}

#[cfg(test)]
mod tests {
    use super::write_atomic;
    use std::io::ErrorKind;

    #[test]
    fn replaces_existing_content_without_leaving_temp_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("cache.json");
        std::fs::write(&target, "old").expect("seed file");

        write_atomic(&target, b"new").expect("atomic write should succeed");

        assert_eq!(std::fs::read_to_string(&target).expect("read back"), "new");
        let entries = std::fs::read_dir(dir.path()).expect("list dir").count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn missing_parent_directory_reports_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("absent").join("cache.json");
        let err = write_atomic(&target, b"{}").expect_err("parent is missing");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
