//! Build verifier against real commands and files.

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::fs;
use std::path::{Path, PathBuf};

use car_common::control::config::{ControlConfig, VerifierConfig};
use car_common::manifest::ManifestSymbols;
use car_control_unit::bridge::ControllerBridge;
use car_control_unit::bridge::lifecycle::Lifecycle;
use car_control_unit::verify::{BuildVerifier, VerifyFailure, verify_path};
use tempfile::TempDir;

fn sh(script: &str, dir: &TempDir) -> BuildVerifier {
    BuildVerifier::new(&VerifierConfig {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        working_dir: Some(dir.path().to_path_buf()),
        artifact: Some(dir.path().join(VerifierConfig::artifact_file_name())),
    })
}

#[test]
fn failing_build_reports_build_failed() {
    let dir = TempDir::new().unwrap();
    let result = sh("echo 'error: could not compile' >&2; exit 3", &dir).rebuild_and_verify();
    assert!(!result.ok);
    assert!(matches!(result.failure, Some(VerifyFailure::BuildFailed(_))));
    assert!(result.missing.is_empty());
}

#[test]
fn rebuild_removes_stale_artifact() {
    let dir = TempDir::new().unwrap();
    let verifier = sh("exit 0", &dir);
    fs::write(verifier.artifact(), b"left over from an earlier build").unwrap();

    let result = verifier.rebuild_and_verify();
    assert_eq!(
        result.failure,
        Some(VerifyFailure::ArtifactMissing(verifier.artifact().to_path_buf()))
    );
    assert!(!verifier.artifact().exists());
}

#[test]
fn failed_build_leaves_no_stale_artifact() {
    let dir = TempDir::new().unwrap();
    let verifier = sh("exit 1", &dir);
    fs::write(verifier.artifact(), b"stale").unwrap();
    let result = verifier.rebuild_and_verify();
    assert!(matches!(result.failure, Some(VerifyFailure::BuildFailed(_))));
    assert!(!verifier.artifact().exists());
}

#[test]
fn garbage_artifact_fails_to_load() {
    let dir = TempDir::new().unwrap();
    let name = VerifierConfig::artifact_file_name();
    let script = format!("printf 'not a library' > {name}");
    let result = sh(&script, &dir).rebuild_and_verify();
    assert!(!result.ok);
    assert!(matches!(result.failure, Some(VerifyFailure::LoadFailed(_))));
}

#[test]
fn verification_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let verifier = sh("exit 0", &dir);
    assert_eq!(verifier.rebuild_and_verify(), verifier.rebuild_and_verify());
    assert_eq!(verifier.verify_artifact(), verifier.verify_artifact());
}

/// `car_native` cdylib built next to this test binary as a dev-dependency.
fn built_native_library() -> PathBuf {
    let exe = std::env::current_exe().unwrap();
    let deps = exe.parent().unwrap();
    let prefix = format!("{DLL_PREFIX}car_native");
    [deps, deps.parent().unwrap()]
        .into_iter()
        .filter_map(|dir| fs::read_dir(dir).ok())
        .flatten()
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .find(|path| {
            let name = path.file_name().unwrap().to_string_lossy();
            name.starts_with(&prefix) && name.ends_with(DLL_SUFFIX)
        })
        .unwrap_or_else(|| panic!("no {prefix}*{DLL_SUFFIX} near {}", deps.display()))
}

#[test]
fn built_library_verifies_repeatably() {
    let library = built_native_library();
    let first = verify_path(&library);
    let second = verify_path(&library);
    assert!(first.ok, "{first:?}");
    assert!(first.missing.is_empty());
    assert_eq!(first.failure, None);
    assert_eq!(first, second);
}

#[test]
fn copied_build_verifies_repeatably() {
    let dir = TempDir::new().unwrap();
    let script = format!(
        "cp '{}' '{}'",
        built_native_library().display(),
        VerifierConfig::artifact_file_name()
    );
    let verifier = sh(&script, &dir);
    let first = verifier.rebuild_and_verify();
    let second = verifier.rebuild_and_verify();
    assert!(first.ok, "{first:?}");
    assert!(first.missing.is_empty());
    assert_eq!(first, second);

    let bridge = ControllerBridge::start(&ControlConfig::default(), Some(&second)).unwrap();
    assert_eq!(bridge.lifecycle(), Lifecycle::VerifiedOk);
}

#[cfg(target_os = "linux")]
#[test]
fn foreign_library_lists_every_missing_symbol() {
    let Some(libm) = ["/lib/x86_64-linux-gnu/libm.so.6", "/lib64/libm.so.6", "/usr/lib/libm.so.6"]
        .into_iter()
        .map(Path::new)
        .find(|p| p.exists())
    else {
        return;
    };
    let result = verify_path(libm);
    assert!(!result.ok);
    assert_eq!(result.failure, Some(VerifyFailure::MissingSymbols));
    let expected: Vec<_> = ManifestSymbols::all().names().collect();
    assert_eq!(result.missing.len(), expected.len());
    assert!(result.missing.contains("car_control_step"));
    assert!(result.missing.contains("car_drive_mode"));
}

#[test]
fn failed_verification_starts_bridge_on_interpreted() {
    let dir = TempDir::new().unwrap();
    let result = sh("exit 2", &dir).rebuild_and_verify();
    let bridge = ControllerBridge::start(&ControlConfig::default(), Some(&result)).unwrap();
    assert_eq!(bridge.lifecycle(), Lifecycle::VerifiedFailed);
}

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .to_path_buf()
}

/// Builds `car_native` with cargo; slow.
#[test]
#[ignore]
fn real_build_verifies_and_loads() {
    let root = workspace_root();
    let config = VerifierConfig {
        working_dir: Some(root.clone()),
        ..VerifierConfig::default()
    };
    let result = BuildVerifier::new(&config).rebuild_and_verify();
    assert!(result.ok, "{result:?}");
    assert!(result.missing.is_empty());

    let mut control = ControlConfig::default();
    control.bridge.require_native = true;
    let bridge = ControllerBridge::start(&control, Some(&result)).unwrap();
    assert_eq!(bridge.lifecycle(), Lifecycle::VerifiedOk);
}
