//! Wrapper scripts and optional systemd user services
//!
//! Wrapper scripts are always written. Units, daemon reload, enabling and
//! lingering are each behind a question, and their failures only warn.

use crate::install::error::{InstallError, IoSnafu, SupportSnafu};
use crate::install::prompt::{Prompter, Question};
use crate::install::runner::{Step, StepRunner};
use crate::install::system::{ensure_privileges, privileged};
use snafu::ResultExt;
use std::fs;
use std::path::{Path, PathBuf};
use zond_setup_lib::InstallerConfig;
use zond_setup_lib::render::{service_units, wrapper_scripts};

/// What the services stage ended up doing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceSummary {
    pub units: Vec<PathBuf>,
    pub daemon_reloaded: bool,
    pub enabled: bool,
    pub linger: bool,
}

/// `~/.config/systemd/user`
pub fn systemd_user_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("systemd").join("user"))
}

/// Write both wrapper scripts into the install root (mode 0755)
pub fn write_wrapper_scripts(config: &InstallerConfig, root: &Path) -> Result<Vec<PathBuf>, InstallError> {
    let scripts = wrapper_scripts(config, root).context(SupportSnafu {
        action: "render wrapper scripts",
    })?;

    let mut written = Vec::new();
    for script in &scripts {
        let path = script.write_to(root).context(SupportSnafu {
            action: format!("write {}", script.name),
        })?;
        println!("✅ Wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// Write both unit files into `unit_dir`
pub fn write_units(config: &InstallerConfig, root: &Path, unit_dir: &Path) -> Result<Vec<PathBuf>, InstallError> {
    fs::create_dir_all(unit_dir).with_context(|_| IoSnafu {
        action: format!("create {}", unit_dir.display()),
    })?;

    let units = service_units(config, root).context(SupportSnafu {
        action: "render unit files",
    })?;

    let mut written = Vec::new();
    for unit in &units {
        let path = unit.write_to(unit_dir).context(SupportSnafu {
            action: format!("write {}", unit.name),
        })?;
        println!("✅ Wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

fn ask(prompter: &mut dyn Prompter, question: &Question) -> Result<bool, InstallError> {
    prompter.confirm(question).context(IoSnafu {
        action: "read answer",
    })
}

/// Services stage: units, daemon reload, enable + start, lingering
pub fn configure_services(
    runner: &StepRunner,
    config: &InstallerConfig,
    root: &Path,
    unit_dir: &Path,
    prompter: &mut dyn Prompter,
) -> Result<ServiceSummary, InstallError> {
    let mut summary = ServiceSummary::default();

    if !ask(prompter, &Question::WriteServiceUnits)? {
        println!("ℹ️  Skipping systemd services; start the node with the wrapper scripts");
        return Ok(summary);
    }

    summary.units = write_units(config, root, unit_dir)?;

    let reload = "systemctl --user daemon-reload";
    if ask(prompter, &Question::ReloadDaemon)? {
        summary.daemon_reloaded = runner.run_soft(&Step::new("Reloading systemd user daemon", reload), reload);
    } else {
        println!("ℹ️  Pick up the new units later with: {reload}");
    }

    let svc = &config.services;
    let enable = format!(
        "systemctl --user enable --now {} {}",
        svc.execution_unit, svc.beacon_unit
    );
    if ask(prompter, &Question::EnableServices)? {
        summary.enabled = runner.run_soft(&Step::new("Enabling and starting services", enable.as_str()), &enable);
    } else {
        println!("ℹ️  Start later with: {enable}");
    }

    let user = whoami::username();
    let linger = format!("loginctl enable-linger {user}");
    if ask(prompter, &Question::EnableLinger { user: user.clone() })? {
        summary.linger = match ensure_privileges() {
            Ok(()) => runner.run_soft(
                &Step::new("Enabling lingering", privileged(&linger)),
                &format!("sudo {linger}"),
            ),
            Err(e) => {
                tracing::warn!(error = %e, "lingering skipped");
                eprintln!("⚠️  {e}");
                eprintln!("   Run manually: sudo {linger}");
                false
            }
        };
    }

    Ok(summary)
}
