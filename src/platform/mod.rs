//! Platform resolution.
//!
//! Detects the distribution family once per invocation and produces the
//! immutable [`PlatformProfile`] every other component is given.

mod family;
mod lock;
mod profile;
mod resolver;

pub use family::{
    compact_version, version_from_path, Binding, FamilyTable, ModuleLayout, OsFamily,
    PackageManager,
};
pub use lock::{ensure_package_manager_unlocked, lock_paths};
pub use profile::PlatformProfile;
pub use resolver::{OsRelease, PlatformResolver};
