//! Install report: printed summary plus `install-report.toml` in the install root

use crate::install::error::{InstallError, IoSnafu};
use crate::install::services::ServiceSummary;
use crate::install::verify::ArtifactCheck;
use serde::Serialize;
use snafu::ResultExt;
use std::fs;
use std::path::{Path, PathBuf};

pub const REPORT_FILE: &str = "install-report.toml";

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub meta: ReportMeta,
    pub binaries: Vec<ArtifactCheck>,
    pub files: ReportFiles,
    pub services: ReportServices,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub timestamp: String,
    pub installer_version: String,
    pub config_source: String,
    pub install_dir: PathBuf,
    pub log_file: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportFiles {
    pub metadata: Vec<PathBuf>,
    pub wrapper_scripts: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportServices {
    pub units: Vec<PathBuf>,
    pub daemon_reloaded: bool,
    pub enabled: bool,
    pub linger: bool,
}

impl From<&ServiceSummary> for ReportServices {
    fn from(summary: &ServiceSummary) -> Self {
        Self {
            units: summary.units.clone(),
            daemon_reloaded: summary.daemon_reloaded,
            enabled: summary.enabled,
            linger: summary.linger,
        }
    }
}

/// Serialize to TOML
pub fn serialize_report(report: &InstallReport) -> Result<String, InstallError> {
    toml::to_string_pretty(report).map_err(|e| InstallError::Support {
        action: "serialize install report".to_string(),
        source: Box::new(e),
    })
}

/// Write `install-report.toml` under `root`
pub fn write_report(report: &InstallReport, root: &Path) -> Result<PathBuf, InstallError> {
    let path = root.join(REPORT_FILE);
    let content = format!(
        "# zond-setup install report\n\n{}",
        serialize_report(report)?
    );
    fs::write(&path, content).with_context(|_| IoSnafu {
        action: format!("write {}", path.display()),
    })?;
    Ok(path)
}

/// Human-readable summary
pub fn print_report(report: &InstallReport) {
    println!();
    println!("⛓️  Zond node installation");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Finished: {}", report.meta.timestamp);
    println!("Install dir: {}", report.meta.install_dir.display());
    println!();

    println!("📦 Executables:");
    for bin in &report.binaries {
        println!("  {} {}", if bin.is_ok() { "✅" } else { "❌" }, bin.path.display());
    }

    println!();
    println!("📄 Files:");
    for path in report.files.metadata.iter().chain(&report.files.wrapper_scripts) {
        println!("  {}", path.display());
    }

    let svc = &report.services;
    if !svc.units.is_empty() {
        println!();
        println!("🔧 Services:");
        for unit in &svc.units {
            println!("  {}", unit.display());
        }
        println!("  enabled: {}  lingering: {}", svc.enabled, svc.linger);
    }

    println!();
    println!("📝 Log: {}", report.meta.log_file.display());
}
