//! Go toolchain via a version manager
//!
//! The manager is installed only when missing, profile lines are appended only
//! when absent, and the pinned Go version is always requested (the manager
//! itself treats a reinstall as a no-op).

use crate::install::error::{Flow, StageResult, SupportSnafu};
use crate::install::runner::{Step, StepRunner};
use snafu::ResultExt;
use std::path::PathBuf;
use std::process::Command;
use zond_setup_lib::InstallerConfig;
use zond_setup_lib::profile::append_missing_lines;

/// Check if binary exists in PATH
fn find_binary(name: &str) -> Option<PathBuf> {
    Command::new("which")
        .arg(name)
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout)
                    .ok()
                    .map(|s| PathBuf::from(s.trim()))
            } else {
                None
            }
        })
}

/// The manager is usable if its activation script exists or it is on PATH
pub fn manager_present(config: &InstallerConfig) -> bool {
    config.manager_script_path().is_file() || find_binary(&config.toolchain.manager).is_some()
}

fn quoted(path: &std::path::Path) -> String {
    format!("\"{}\"", path.display())
}

/// Installs the manager by piping its installer script into bash
pub fn manager_install_command(config: &InstallerConfig) -> String {
    format!(
        "bash < <(curl -sSL {})",
        config.toolchain.installer_url
    )
}

/// Binary install of the pinned version, falling back to `use` when it is
/// already installed
pub fn toolchain_install_command(config: &InstallerConfig) -> String {
    let tc = &config.toolchain;
    format!(
        "source {script} && {mgr} install {ver} -B || {{ source {script} && {mgr} use {ver}; }}",
        script = quoted(&config.manager_script_path()),
        mgr = tc.manager,
        ver = tc.version,
    )
}

/// Lines every later step needs so `go` resolves to the pinned version
pub fn session_lines(config: &InstallerConfig) -> Vec<String> {
    let tc = &config.toolchain;
    let mut lines = vec![
        format!("source {}", quoted(&config.manager_script_path())),
        format!("{} use {}", tc.manager, tc.version),
    ];
    lines.extend(tc.profile_lines.iter().cloned());
    lines
}

/// Toolchain stage
pub fn install_toolchain(runner: &mut StepRunner, config: &InstallerConfig) -> StageResult {
    let tc = &config.toolchain;

    if manager_present(config) {
        println!("ℹ️  {} already installed - skipping", tc.manager);
    } else {
        runner.run(&Step::new(
            format!("Installing {}", tc.manager),
            manager_install_command(config),
        ))?;
    }

    let profile = config.profile_path();
    let added = append_missing_lines(&profile, &tc.profile_lines).context(SupportSnafu {
        action: format!("update {}", profile.display()),
    })?;
    if added.is_empty() {
        println!("ℹ️  {} already configured", profile.display());
    } else {
        println!("✅ Added {} line(s) to {}", added.len(), profile.display());
    }

    runner.run(&Step::new(
        format!("Installing Go {}", tc.version),
        toolchain_install_command(config),
    ))?;

    for line in session_lines(config) {
        runner.env_mut().push(line);
    }
    tracing::info!(version = %tc.version, "toolchain ready");

    Ok(Flow::Continue)
}
