//! Package manager lock detection.
//!
//! Installs and removals fail fast with `PackageManagerLocked` instead of
//! blocking behind another package manager run.

use std::fs::File;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use nix::fcntl::{fcntl, FcntlArg};
use nix::libc;
use tracing::debug;

use super::family::PackageManager;
use super::profile::PlatformProfile;
use crate::error::{StackError, StackResult};

/// How a lock is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockKind {
    /// A POSIX record lock on the file (dpkg, rpm).
    Fcntl,
    /// The file exists only while the lock is held (pacman).
    Presence,
}

fn lock_files(manager: PackageManager) -> &'static [(&'static str, LockKind)] {
    match manager {
        PackageManager::Apt => &[
            ("/var/lib/dpkg/lock-frontend", LockKind::Fcntl),
            ("/var/lib/dpkg/lock", LockKind::Fcntl),
        ],
        PackageManager::Dnf | PackageManager::Yum => {
            &[("/var/lib/rpm/.rpm.lock", LockKind::Fcntl)]
        }
        PackageManager::Pacman => &[("/var/lib/pacman/db.lck", LockKind::Presence)],
    }
}

/// Fail with `PackageManagerLocked` if the family's lock is currently held.
pub fn ensure_package_manager_unlocked(profile: &PlatformProfile) -> StackResult<()> {
    for (file, kind) in lock_files(profile.package_manager) {
        let path = profile.host_path(file);
        if is_held(&path, *kind) {
            return Err(StackError::PackageManagerLocked { lock: path });
        }
        debug!(lock = %path.display(), "Package manager lock is free");
    }
    Ok(())
}

fn is_held(path: &Path, kind: LockKind) -> bool {
    match kind {
        LockKind::Presence => path.exists(),
        LockKind::Fcntl => fcntl_lock_held(path),
    }
}

/// Ask the kernel whether a write lock could be placed on `path`.
///
/// F_GETLK never acquires anything, so the query cannot interfere with a
/// concurrent package manager. Unreadable or missing files count as free.
fn fcntl_lock_held(path: &Path) -> bool {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            debug!(lock = %path.display(), error = %e, "Lock file not readable");
            return false;
        }
    };

    let mut query = libc::flock {
        l_type: libc::F_WRLCK as libc::c_short,
        l_whence: libc::SEEK_SET as libc::c_short,
        l_start: 0,
        l_len: 0,
        l_pid: 0,
    };

    match fcntl(file.as_raw_fd(), FcntlArg::F_GETLK(&mut query)) {
        Ok(_) => query.l_type != libc::F_UNLCK as libc::c_short,
        Err(errno) => {
            debug!(lock = %path.display(), error = %errno, "F_GETLK query failed");
            false
        }
    }
}

/// Lock files checked for the profile's package manager.
pub fn lock_paths(profile: &PlatformProfile) -> Vec<PathBuf> {
    lock_files(profile.package_manager)
        .iter()
        .map(|(file, _)| profile.host_path(file))
        .collect()
}
