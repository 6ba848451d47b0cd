//! End-to-end check: every required executable is present at the install root

use crate::install::error::InstallError;
use serde::Serialize;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use zond_setup_lib::InstallerConfig;

/// Result of checking a single executable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactCheck {
    pub name: String,
    pub path: PathBuf,
    pub exists: bool,
    pub executable: bool,
}

impl ArtifactCheck {
    pub fn is_ok(&self) -> bool {
        self.exists && self.executable
    }
}

fn check_one(root: &Path, name: &str) -> ArtifactCheck {
    let path = root.join(name);
    let meta = std::fs::metadata(&path).ok().filter(std::fs::Metadata::is_file);
    ArtifactCheck {
        name: name.to_string(),
        exists: meta.is_some(),
        executable: meta.is_some_and(|m| m.permissions().mode() & 0o111 != 0),
        path,
    }
}

/// Check every binary the configured builds produce
pub fn check_artifacts(config: &InstallerConfig, root: &Path) -> Vec<ArtifactCheck> {
    config
        .built_binaries()
        .iter()
        .map(|name| check_one(root, name))
        .collect()
}

/// Fail unless every binary exists and is executable
pub fn verify_artifacts(config: &InstallerConfig, root: &Path) -> Result<Vec<ArtifactCheck>, InstallError> {
    let checks = check_artifacts(config, root);
    let missing: Vec<String> = checks
        .iter()
        .filter(|c| !c.is_ok())
        .map(|c| c.name.clone())
        .collect();

    if !missing.is_empty() {
        return Err(InstallError::MissingArtifacts { missing });
    }

    println!("✅ All {} executables present", checks.len());
    Ok(checks)
}
