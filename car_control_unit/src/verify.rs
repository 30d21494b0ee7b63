//! Build & symbol verifier.
//!
//! Rebuilds the native artifact and decides whether the bridge may trust
//! it. The previous artifact is removed first, so a failed build can never
//! leave a stale library behind that would verify by accident.
//!
//! | Step | Failure |
//! |------|---------|
//! | run build command | `BuildFailed` |
//! | artifact exists | `ArtifactMissing` |
//! | open library | `LoadFailed` |
//! | every manifest entry exported | `MissingSymbols` |
//! | `car_manifest_version` matches | `VersionMismatch` |
//!
//! Verification never runs inside the tick loop.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use car_common::control::config::VerifierConfig;
use car_common::manifest::{MANIFEST_VERSION, ManifestSymbols};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::native::{manifest_version, open_library, probe};

/// Why verification did not pass.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum VerifyFailure {
    /// The build command could not be started or exited unsuccessfully.
    #[error("build failed: {0}")]
    BuildFailed(String),

    /// The build succeeded but produced no artifact.
    #[error("artifact missing: {0}")]
    ArtifactMissing(PathBuf),

    /// The artifact is not a loadable library.
    #[error("artifact failed to load: {0}")]
    LoadFailed(String),

    /// Manifest entries are not exported.
    #[error("missing manifest symbols")]
    MissingSymbols,

    /// The library implements another manifest version.
    #[error("manifest version {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },
}

/// Outcome of one verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    /// The artifact may be trusted.
    pub ok: bool,
    /// Manifest entries the artifact does not export.
    pub missing: BTreeSet<&'static str>,
    /// Failure reason when `ok` is false.
    pub failure: Option<VerifyFailure>,
    /// Artifact the result refers to.
    pub artifact: PathBuf,
}

impl VerificationResult {
    fn passed(artifact: &Path) -> Self {
        Self {
            ok: true,
            missing: BTreeSet::new(),
            failure: None,
            artifact: artifact.to_path_buf(),
        }
    }

    fn failed(artifact: &Path, failure: VerifyFailure) -> Self {
        Self {
            ok: false,
            missing: BTreeSet::new(),
            failure: Some(failure),
            artifact: artifact.to_path_buf(),
        }
    }
}

/// Rebuilds and verifies the native artifact.
#[derive(Debug, Clone)]
pub struct BuildVerifier {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    artifact: PathBuf,
}

impl BuildVerifier {
    pub fn new(config: &VerifierConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            working_dir: config.working_dir.clone(),
            artifact: config.artifact_path(),
        }
    }

    /// Artifact location.
    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    /// Remove the old artifact, run the build and verify the new artifact.
    pub fn rebuild_and_verify(&self) -> VerificationResult {
        if let Err(failure) = self.remove_stale_artifact() {
            return VerificationResult::failed(&self.artifact, failure);
        }

        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(ref dir) = self.working_dir {
            command.current_dir(dir);
        }
        info!(
            "Building native artifact: {} {}",
            self.program,
            self.args.join(" ")
        );

        let output = match command.output() {
            Ok(output) => output,
            Err(e) => {
                warn!("Build command could not be started: {e}");
                return VerificationResult::failed(
                    &self.artifact,
                    VerifyFailure::BuildFailed(format!("{}: {e}", self.program)),
                );
            }
        };
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, "Native build failed: {}", stderr.trim());
            return VerificationResult::failed(
                &self.artifact,
                VerifyFailure::BuildFailed(output.status.to_string()),
            );
        }

        if !self.artifact.exists() {
            warn!("Build produced no artifact at {}", self.artifact.display());
            return VerificationResult::failed(
                &self.artifact,
                VerifyFailure::ArtifactMissing(self.artifact.clone()),
            );
        }

        self.verify_artifact()
    }

    /// Verify the artifact as it is, without rebuilding.
    pub fn verify_artifact(&self) -> VerificationResult {
        verify_path(&self.artifact)
    }

    /// A previous artifact that cannot be removed fails the build; the
    /// build tool could otherwise treat it as up to date.
    fn remove_stale_artifact(&self) -> Result<(), VerifyFailure> {
        match fs::remove_file(&self.artifact) {
            Ok(()) => {
                debug!("Removed previous artifact {}", self.artifact.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(
                    "Could not remove previous artifact {}: {e}",
                    self.artifact.display()
                );
                Err(VerifyFailure::BuildFailed(format!(
                    "could not remove stale artifact {}: {e}",
                    self.artifact.display()
                )))
            }
        }
    }
}

/// Load `path` and check the symbol manifest.
pub fn verify_path(path: &Path) -> VerificationResult {
    if !path.exists() {
        return VerificationResult::failed(path, VerifyFailure::ArtifactMissing(path.to_path_buf()));
    }
    let library = match open_library(path) {
        Ok(library) => library,
        Err(e) => {
            warn!("{e}");
            return VerificationResult::failed(path, VerifyFailure::LoadFailed(e.to_string()));
        }
    };

    check_manifest(path, probe(&library), manifest_version(&library))
}

/// Decide the outcome from the exported manifest entries and the reported
/// manifest version.
pub fn check_manifest(
    path: &Path,
    present: ManifestSymbols,
    version: Option<u32>,
) -> VerificationResult {
    let missing = ManifestSymbols::all().difference(present);
    if !missing.is_empty() {
        let names: BTreeSet<_> = missing.names().collect();
        warn!(
            "Native artifact lacks {} manifest symbols: {:?}",
            names.len(),
            names
        );
        return VerificationResult {
            missing: names,
            ..VerificationResult::failed(path, VerifyFailure::MissingSymbols)
        };
    }

    match version {
        Some(MANIFEST_VERSION) => {
            info!("Native artifact verified: {}", path.display());
            VerificationResult::passed(path)
        }
        found => {
            let found = found.unwrap_or(0);
            warn!("Native artifact reports manifest version {found}, expected {MANIFEST_VERSION}");
            VerificationResult::failed(
                path,
                VerifyFailure::VersionMismatch {
                    found,
                    expected: MANIFEST_VERSION,
                },
            )
        }
    }
}
