//! Symlink toggling for "available"/"enabled" directory pairs.

use std::fs;
use std::os::unix::fs as unix_fs;
use std::path::Path;

use tracing::debug;

use crate::error::StackError;

/// Whether `path` itself is a symlink (not followed).
pub fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// Make `link` a symlink to `target`.
///
/// Returns `false` when it already pointed there. A symlink pointing
/// elsewhere is replaced; a regular file in the way is an error.
pub fn ensure_symlink(target: &Path, link: &Path) -> Result<bool, StackError> {
    match fs::symlink_metadata(link) {
        Ok(meta) if meta.file_type().is_symlink() => {
            if fs::read_link(link)? == target {
                return Ok(false);
            }
            fs::remove_file(link)?;
        }
        Ok(_) => {
            return Err(StackError::execution(format!(
                "A file (not symlink) already exists at {}",
                link.display()
            )));
        }
        Err(_) => {}
    }

    if let Some(parent) = link.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    unix_fs::symlink(target, link)?;
    debug!(target = %target.display(), link = %link.display(), "Symlink created");
    Ok(true)
}

/// Remove `link` if it is a symlink. Returns `false` when there was none.
///
/// Regular files are never removed.
pub fn remove_symlink(link: &Path) -> Result<bool, StackError> {
    if !is_symlink(link) {
        return Ok(false);
    }
    fs::remove_file(link)?;
    debug!(link = %link.display(), "Symlink removed");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symlink_toggle_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("available/site.conf");
        let link = dir.path().join("enabled/site.conf");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, "x").unwrap();

        assert!(ensure_symlink(&target, &link).unwrap());
        assert!(!ensure_symlink(&target, &link).unwrap());
        assert!(is_symlink(&link));

        assert!(remove_symlink(&link).unwrap());
        assert!(!remove_symlink(&link).unwrap());
        assert!(target.exists());
    }

    #[test]
    fn test_regular_file_is_not_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("t");
        let link = dir.path().join("l");
        fs::write(&link, "mine").unwrap();

        assert!(ensure_symlink(&target, &link).is_err());
        assert!(!remove_symlink(&link).unwrap());
        assert_eq!(fs::read_to_string(&link).unwrap(), "mine");
    }
}
