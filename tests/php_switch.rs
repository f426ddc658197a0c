//! Switching the web server's PHP module on a sandboxed module tree.

mod common;

use std::fs;
use std::path::PathBuf;

use stackctl::error::StackError;
use stackctl::executor::DryRunRunner;
use stackctl::php::{ApacheModuleBackend, SwitchEngine, VariantBackend};
use stackctl::platform::{ModuleLayout, OsFamily, PlatformProfile};

use common::TIMEOUT;

fn module_dirs(profile: &PlatformProfile) -> (PathBuf, PathBuf) {
    match &profile.php_modules {
        ModuleLayout::Symlinked { available, enabled } => (available.clone(), enabled.clone()),
        ModuleLayout::Renamed { .. } => panic!("debian uses symlinked modules"),
    }
}

fn enabled(backend: &dyn VariantBackend) -> Vec<String> {
    backend
        .variants()
        .unwrap()
        .into_iter()
        .filter(|v| v.enabled)
        .map(|v| v.version)
        .collect()
}

fn debian_with_modules(root: &std::path::Path, versions: &[(&str, bool)]) -> PlatformProfile {
    let profile = PlatformProfile::for_family(OsFamily::Debian).rebased(root);
    let (available, enabled_dir) = module_dirs(&profile);
    fs::create_dir_all(&available).unwrap();
    fs::create_dir_all(&enabled_dir).unwrap();
    for (version, on) in versions {
        let load = available.join(format!("php{}.load", version));
        fs::write(&load, format!("LoadModule php_module libphp{}.so\n", version)).unwrap();
        if *on {
            std::os::unix::fs::symlink(&load, enabled_dir.join(format!("php{}.load", version)))
                .unwrap();
        }
    }
    profile
}

#[test]
fn switch_leaves_only_the_target_enabled() {
    let tmp = tempfile::tempdir().unwrap();
    let profile = debian_with_modules(tmp.path(), &[("7.4", true), ("8.1", true), ("8.3", false)]);
    let backend = ApacheModuleBackend::new(&profile);
    let runner = DryRunRunner::new();
    let engine = SwitchEngine::new(&profile, &backend, &runner, TIMEOUT, TIMEOUT);

    let outcome = engine.switch("8.3").unwrap();
    assert!(outcome.changed);
    assert_eq!(enabled(&backend), vec!["8.3"]);
    assert_eq!(outcome.restarted_unit.as_deref(), Some("apache2"));
    assert_eq!(runner.recorded(), vec!["systemctl restart apache2"]);
    assert_eq!(engine.active().unwrap().unwrap().version, "8.3");
}

#[test]
fn switch_to_missing_version_changes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let profile = debian_with_modules(tmp.path(), &[("8.1", true), ("8.2", false)]);
    let backend = ApacheModuleBackend::new(&profile);
    let runner = DryRunRunner::new();
    let engine = SwitchEngine::new(&profile, &backend, &runner, TIMEOUT, TIMEOUT);
    let before = backend.variants().unwrap();

    let err = engine.switch("9.9").unwrap_err();
    assert!(matches!(err, StackError::NotInstalled { ref version } if version == "9.9"));
    assert_eq!(backend.variants().unwrap(), before);
    assert!(runner.recorded().is_empty());
}

#[test]
fn switching_to_the_active_version_is_a_no_op() {
    let tmp = tempfile::tempdir().unwrap();
    let profile = debian_with_modules(tmp.path(), &[("8.2", true), ("8.3", false)]);
    let backend = ApacheModuleBackend::new(&profile);
    let runner = DryRunRunner::new();
    let engine = SwitchEngine::new(&profile, &backend, &runner, TIMEOUT, TIMEOUT);

    let outcome = engine.switch("8.2").unwrap();
    assert!(!outcome.changed);
    assert!(outcome.restarted_unit.is_none());
    assert!(runner.recorded().is_empty());
}
