//! Privilege elevation and apt packages

use crate::install::error::{Flow, InstallError, StageResult};
use crate::install::runner::{Step, StepRunner};
use std::process::Command;

/// True when already running as root
pub fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Prefix a command with `sudo` unless we are root
pub fn privileged(command: &str) -> String {
    if is_root() {
        command.to_string()
    } else {
        format!("sudo {command}")
    }
}

/// Refresh sudo credentials up front so no step stalls on a password prompt
/// behind the spinner
pub fn ensure_privileges() -> Result<(), InstallError> {
    if is_root() {
        return Ok(());
    }

    println!("🔑 Administrator privileges required (sudo)...");
    let status = Command::new("sudo")
        .arg("-v")
        .status()
        .map_err(|e| InstallError::PrivilegeUnavailable {
            reason: format!("could not run sudo: {e}"),
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(InstallError::PrivilegeUnavailable {
            reason: "sudo authentication failed".to_string(),
        })
    }
}

/// `apt-get install` command for the configured package list
pub fn install_command(packages: &[String]) -> String {
    privileged(&format!(
        "env DEBIAN_FRONTEND=noninteractive apt-get install -y {}",
        packages.join(" ")
    ))
}

/// Packages stage: refresh the index, then install everything in one go
pub fn install_packages(runner: &StepRunner, packages: &[String]) -> StageResult {
    if packages.is_empty() {
        return Ok(Flow::Continue);
    }

    ensure_privileges()?;
    runner.run(&Step::new(
        "Updating package index",
        privileged("apt-get update"),
    ))?;
    runner.run(&Step::new(
        format!("Installing packages: {}", packages.join(", ")),
        install_command(packages),
    ))?;

    Ok(Flow::Continue)
}
