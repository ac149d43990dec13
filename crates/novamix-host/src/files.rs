//! Per-user file placement.

use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tracing::{debug, info};

use crate::error::HostResult;

/// Mode given to the installed helper.
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Copy `source` to `target`, creating the parent directory first.
///
/// # Errors
/// Returns an error if the directory cannot be created or the copy fails.
pub fn copy_into_place(source: &Path, target: &Path) -> HostResult<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes = fs::copy(source, target)?;
    debug!(?source, ?target, bytes, "Copied file");
    Ok(())
}

/// Copy the helper into place and mark it executable.
///
/// # Errors
/// Returns an error if the copy or the permission change fails.
pub fn place_executable(source: &Path, target: &Path) -> HostResult<()> {
    copy_into_place(source, target)?;
    fs::set_permissions(target, fs::Permissions::from_mode(EXECUTABLE_MODE))?;
    info!(?target, "Helper binary placed");
    Ok(())
}

/// Delete a file, treating an already missing file as success.
///
/// # Errors
/// Returns an error for any failure other than the file not existing.
pub fn remove_if_present(target: &Path) -> HostResult<()> {
    match fs::remove_file(target) {
        Ok(()) => {
            debug!(?target, "Removed file");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Whether `path` is a regular file with any execute bit set.
#[must_use]
pub fn is_executable(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_executable_creates_dir_and_sets_mode() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("nova-chatmix.py");
        fs::write(&source, "#!/usr/bin/python3\n").unwrap();
        let target = dir.path().join(".local/bin/nova-chatmix");

        place_executable(&source, &target).unwrap();

        assert!(is_executable(&target));
        let mode = fs::metadata(&target).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, EXECUTABLE_MODE);
    }

    #[test]
    fn test_place_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("helper");
        let target = dir.path().join("bin/nova-chatmix");
        fs::write(&source, "v1").unwrap();
        place_executable(&source, &target).unwrap();

        fs::write(&source, "v2").unwrap();
        place_executable(&source, &target).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "v2");
    }

    #[test]
    fn test_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = place_executable(&dir.path().join("absent"), &dir.path().join("bin/x"));
        assert!(result.is_err());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nova-chatmix.service");
        fs::write(&target, "[Unit]\n").unwrap();

        remove_if_present(&target).unwrap();
        assert!(!target.exists());
        remove_if_present(&target).unwrap();
    }

    #[test]
    fn test_plain_file_not_executable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain");
        fs::write(&path, "x").unwrap();
        assert!(!is_executable(&path));
        assert!(!is_executable(&dir.path().join("missing")));
    }
}
