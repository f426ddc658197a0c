//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::time::Duration;

use stackctl::platform::{OsFamily, PlatformProfile};

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// A profile for `family` rebased under `root`, with the web server's
/// configuration directory present.
pub fn sandbox(family: OsFamily, root: &Path) -> PlatformProfile {
    let profile = PlatformProfile::for_family(family).rebased(root);
    fs::create_dir_all(&profile.config_dir).unwrap();
    fs::create_dir_all(&profile.vhost_dir).unwrap();
    if let Some(dir) = &profile.enabled_vhost_dir {
        fs::create_dir_all(dir).unwrap();
    }
    profile
}

/// How many lines of `text` contain `needle`.
pub fn count(text: &str, needle: &str) -> usize {
    text.lines().filter(|l| l.contains(needle)).count()
}
