//! Top-level driver: runs the stages in order and stops at the first one that
//! does not say `Flow::Continue`

use crate::install::error::{Flow, InstallError, StageResult};
use crate::install::metadata::fetch_metadata;
use crate::install::preflight::{PreflightVerdict, run_preflight};
use crate::install::prompt::Prompter;
use crate::install::report::{
    InstallReport, ReportFiles, ReportMeta, ReportServices, print_report, write_report,
};
use crate::install::runner::StepRunner;
use crate::install::services::{ServiceSummary, configure_services, write_wrapper_scripts};
use crate::install::sources::{build_sources, prepare_install_dir};
use crate::install::system::install_packages;
use crate::install::toolchain::install_toolchain;
use crate::install::verify::verify_artifacts;
use chrono::Utc;
use std::path::PathBuf;
use zond_setup_lib::InstallerConfig;
use zond_setup_lib::config::ConfigSource;

/// Knobs the CLI passes through
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub skip_services: bool,
    /// Where unit files go; `None` means the systemd user dir could not be located
    pub unit_dir: Option<PathBuf>,
}

/// Final state of a run that did not fail
#[derive(Debug)]
pub enum Outcome {
    Installed(Box<InstallReport>),
    Halted,
}

/// Owns everything the stages share
pub struct Installer<'a> {
    config: &'a InstallerConfig,
    source: ConfigSource,
    prompter: &'a mut dyn Prompter,
    runner: StepRunner,
    options: InstallOptions,
}

fn stage(name: &str, result: StageResult) -> Result<bool, InstallError> {
    let flow = result?;
    tracing::info!(stage = name, ?flow, "stage complete");
    Ok(flow == Flow::Continue)
}

impl<'a> Installer<'a> {
    pub fn new(
        config: &'a InstallerConfig,
        source: ConfigSource,
        prompter: &'a mut dyn Prompter,
        runner: StepRunner,
        options: InstallOptions,
    ) -> Self {
        Self {
            config,
            source,
            prompter,
            runner,
            options,
        }
    }

    /// Run every stage against an already-evaluated preflight verdict
    pub fn run(&mut self, verdict: &PreflightVerdict) -> Result<Outcome, InstallError> {
        let config = self.config;
        let root = config.install_root();

        println!("📝 Logging to {}", self.runner.log().path().display());

        if !stage("preflight", run_preflight(verdict, &mut *self.prompter))? {
            return Ok(Outcome::Halted);
        }
        if !stage("install-dir", prepare_install_dir(&root, &mut *self.prompter))? {
            return Ok(Outcome::Halted);
        }
        if !stage("packages", install_packages(&self.runner, &config.packages.names))? {
            return Ok(Outcome::Halted);
        }
        if !stage("toolchain", install_toolchain(&mut self.runner, config))? {
            return Ok(Outcome::Halted);
        }
        if !stage("sources", build_sources(&self.runner, config, &root))? {
            return Ok(Outcome::Halted);
        }
        if !stage("metadata", fetch_metadata(&self.runner, config, &root))? {
            return Ok(Outcome::Halted);
        }

        let wrapper_scripts = write_wrapper_scripts(config, &root)?;
        let binaries = verify_artifacts(config, &root)?;

        let services = match (&self.options.unit_dir, self.options.skip_services) {
            (_, true) => ServiceSummary::default(),
            (Some(unit_dir), false) => {
                configure_services(&self.runner, config, &root, unit_dir, &mut *self.prompter)?
            }
            (None, false) => {
                eprintln!("⚠️  Could not locate the systemd user directory; skipping services");
                ServiceSummary::default()
            }
        };

        let report = InstallReport {
            meta: ReportMeta {
                timestamp: Utc::now().to_rfc3339(),
                installer_version: zond_setup_lib::VERSION.to_string(),
                config_source: self.source.to_string(),
                install_dir: root.clone(),
                log_file: self.runner.log().path().to_path_buf(),
            },
            binaries,
            files: ReportFiles {
                metadata: vec![
                    root.join(&config.metadata.genesis_file),
                    root.join(&config.metadata.chain_config_file),
                ],
                wrapper_scripts,
            },
            services: ReportServices::from(&services),
        };

        let report_path = write_report(&report, &root)?;
        print_report(&report);
        println!("📄 Report written to: {}", report_path.display());

        Ok(Outcome::Installed(Box::new(report)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::preflight::evaluate;
    use crate::install::prompt::{Question, ScriptedPrompter};
    use crate::install::report::REPORT_FILE;
    use crate::install::runner::StepLog;
    use crate::install::verify::ArtifactCheck;
    use zond_setup_lib::EnvironmentSnapshot;

    fn verdict(config: &InstallerConfig, disk: u64) -> PreflightVerdict {
        let snapshot = EnvironmentSnapshot {
            os_id: config.target.os_id.clone(),
            os_version: config.target.os_version.clone(),
            cpu_cores: 4,
            memory_gb: 8,
            free_storage_gb: disk,
        };
        evaluate(&snapshot, &config.target, &config.requirements)
    }

    #[test]
    fn test_declined_storage_stops_before_any_step() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = InstallerConfig::default();
        config.install_dir = dir.path().join("theQRL").display().to_string();
        let log = dir.path().join("install.log");

        let mut prompter = ScriptedPrompter::new([false]);
        let runner = StepRunner::new(StepLog::at(&log), false);
        let mut installer = Installer::new(
            &config,
            ConfigSource::BuiltIn,
            &mut prompter,
            runner,
            InstallOptions::default(),
        );

        let err = installer.run(&verdict(&config, 5)).unwrap_err();
        assert!(matches!(err, InstallError::StorageDeclined { .. }));
        assert_eq!(err.exit_code(), 1);
        assert!(!log.exists());
        assert!(!dir.path().join("theQRL").exists());
    }

    #[test]
    fn test_declined_reinstall_halts_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("theQRL");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("validator"), "keep me").unwrap();

        let mut config = InstallerConfig::default();
        config.install_dir = root.display().to_string();
        let log = dir.path().join("install.log");

        let mut prompter = ScriptedPrompter::new([false]);
        let runner = StepRunner::new(StepLog::at(&log), false);
        let mut installer = Installer::new(
            &config,
            ConfigSource::BuiltIn,
            &mut prompter,
            runner,
            InstallOptions::default(),
        );

        let outcome = installer.run(&verdict(&config, 100)).unwrap();
        assert!(matches!(outcome, Outcome::Halted));
        assert_eq!(std::fs::read_to_string(root.join("validator")).unwrap(), "keep me");
        assert!(!log.exists());
        assert!(matches!(prompter.asked.as_slice(), [Question::ReplaceInstallDir { .. }]));
    }

    const FAKE_EXECUTION_BUILD: &str = r"mkdir -p build/bin && for b in gzond clef; do printf '#!/bin/sh\nexit 0\n' > build/bin/$b && chmod +x build/bin/$b; done";

    const FAKE_GO: &str = r#"#!/bin/sh
for arg in "$@"; do
  case "$arg" in -o=*) out="${arg#-o=}" ;; esac
done
printf '#!/bin/sh\nexit 0\n' > "$out" && chmod +x "$out"
"#;

    const FAKE_GO_WITHOUT_VALIDATOR: &str = r#"#!/bin/sh
for arg in "$@"; do
  case "$arg" in -o=*) out="${arg#-o=}" ;; esac
done
case "$out" in */validator) exit 0 ;; esac
printf '#!/bin/sh\nexit 0\n' > "$out" && chmod +x "$out"
"#;

    fn has_tool(name: &str) -> bool {
        std::process::Command::new(name)
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    fn shell(dir: &std::path::Path, script: &str) {
        let status = std::process::Command::new("bash")
            .args(["-c", script])
            .current_dir(dir)
            .status()
            .unwrap();
        assert!(status.success(), "{script}");
    }

    fn local_repo(dir: &std::path::Path, name: &str) -> String {
        let repo = dir.join("upstream").join(name);
        std::fs::create_dir_all(&repo).unwrap();
        shell(
            &repo,
            "git init -q . && echo source > README && git add README \
             && git -c user.name=zond -c user.email=zond@localhost commit -q -m init",
        );
        format!("file://{}", repo.display())
    }

    /// A config whose every stage runs offline: no packages, a stub version
    /// manager, a stub `go`, local git repos and local metadata files
    fn offline_config(dir: &std::path::Path, execution_build: &str, go: &str) -> InstallerConfig {
        use std::os::unix::fs::PermissionsExt;

        let manager = dir.join("gvm-script");
        std::fs::write(&manager, "gvm() { return 0; }\n").unwrap();

        let bin = dir.join("fakebin");
        std::fs::create_dir(&bin).unwrap();
        std::fs::write(bin.join("go"), go).unwrap();
        std::fs::set_permissions(bin.join("go"), std::fs::Permissions::from_mode(0o755)).unwrap();

        let meta = dir.join("metadata");
        std::fs::create_dir(&meta).unwrap();
        std::fs::write(meta.join("genesis.ssz"), [7u8; 4]).unwrap();
        std::fs::write(meta.join("config.yml"), "CONFIG_NAME: betanet\n").unwrap();

        let mut config = InstallerConfig::default();
        config.install_dir = dir.join("theQRL").display().to_string();
        config.packages.names = Vec::new();
        config.toolchain.manager_script = manager.display().to_string();
        config.toolchain.profile = dir.join("bashrc").display().to_string();
        config.toolchain.profile_lines = vec![format!("export PATH=\"{}:$PATH\"", bin.display())];
        config.sources.execution_repo = local_repo(dir, "go-zond");
        config.sources.consensus_repo = local_repo(dir, "qrysm");
        config.sources.execution_build = execution_build.to_string();
        config.metadata.genesis_url = format!("file://{}", meta.join("genesis.ssz").display());
        config.metadata.chain_config_url = format!("file://{}", meta.join("config.yml").display());
        config
    }

    fn offline_tools_available() -> bool {
        has_tool("bash") && has_tool("git") && has_tool("curl")
    }

    fn service_options(dir: &std::path::Path) -> InstallOptions {
        InstallOptions {
            skip_services: false,
            unit_dir: Some(dir.join("systemd-user")),
        }
    }

    #[test]
    fn test_failed_build_step_passes_its_exit_code_through() {
        if !offline_tools_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path(), "echo compiling; exit 3", FAKE_GO);
        let root = config.install_root();
        let log = dir.path().join("install.log");

        let mut prompter = ScriptedPrompter::default();
        let runner = StepRunner::new(StepLog::at(&log), false);
        let mut installer = Installer::new(
            &config,
            ConfigSource::BuiltIn,
            &mut prompter,
            runner,
            service_options(dir.path()),
        );

        let err = installer.run(&verdict(&config, 100)).unwrap_err();
        assert!(matches!(err, InstallError::StepFailed { code: 3, .. }));
        assert_eq!(err.exit_code(), 3);

        assert!(std::fs::read_to_string(&log).unwrap().contains("compiling"));
        assert!(std::fs::read_to_string(dir.path().join("bashrc")).unwrap().contains("fakebin"));
        assert!(!root.join(&config.services.execution_script).exists());
        assert!(!root.join(REPORT_FILE).exists());
        assert!(prompter.asked.is_empty());
    }

    #[test]
    fn test_failed_download_stops_before_wrapper_scripts() {
        if !offline_tools_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let mut config = offline_config(dir.path(), FAKE_EXECUTION_BUILD, FAKE_GO);
        config.metadata.genesis_url = format!("file://{}", dir.path().join("absent.ssz").display());
        let root = config.install_root();

        let mut prompter = ScriptedPrompter::default();
        let runner = StepRunner::new(StepLog::at(dir.path().join("install.log")), false);
        let mut installer = Installer::new(
            &config,
            ConfigSource::BuiltIn,
            &mut prompter,
            runner,
            service_options(dir.path()),
        );

        match installer.run(&verdict(&config, 100)).unwrap_err() {
            InstallError::StepFailed {
                description, code, ..
            } => {
                assert!(description.contains("genesis.ssz"));
                assert_ne!(code, 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Builds finished before the download failed
        assert!(root.join("validator").is_file());
        assert!(!root.join(&config.services.execution_script).exists());
        assert!(!root.join(REPORT_FILE).exists());
    }

    #[test]
    fn test_missing_binary_blocks_services_and_report() {
        if !offline_tools_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path(), FAKE_EXECUTION_BUILD, FAKE_GO_WITHOUT_VALIDATOR);
        let root = config.install_root();

        let mut prompter = ScriptedPrompter::new([true]);
        let runner = StepRunner::new(StepLog::at(dir.path().join("install.log")), false);
        let mut installer = Installer::new(
            &config,
            ConfigSource::BuiltIn,
            &mut prompter,
            runner,
            service_options(dir.path()),
        );

        match installer.run(&verdict(&config, 100)).unwrap_err() {
            InstallError::MissingArtifacts { missing } => {
                assert_eq!(missing, vec!["validator".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Wrapper scripts come before verification, services and report after it
        assert!(root.join(&config.services.execution_script).is_file());
        assert!(root.join(&config.services.beacon_script).is_file());
        assert!(!root.join(REPORT_FILE).exists());
        assert!(!dir.path().join("systemd-user").exists());
        assert!(prompter.asked.is_empty());
    }

    #[test]
    fn test_offline_run_installs_and_writes_report() {
        if !offline_tools_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path(), FAKE_EXECUTION_BUILD, FAKE_GO);
        let root = config.install_root();

        // Units yes; reload, enable and linger fall back to "no"
        let mut prompter = ScriptedPrompter::new([true]);
        let runner = StepRunner::new(StepLog::at(dir.path().join("install.log")), false);
        let mut installer = Installer::new(
            &config,
            ConfigSource::BuiltIn,
            &mut prompter,
            runner,
            service_options(dir.path()),
        );

        let Outcome::Installed(report) = installer.run(&verdict(&config, 100)).unwrap() else {
            panic!("install halted");
        };

        assert_eq!(report.binaries.len(), 5);
        assert!(report.binaries.iter().all(ArtifactCheck::is_ok));
        assert_eq!(report.files.wrapper_scripts.len(), 2);
        assert_eq!(report.services.units.len(), 2);
        assert!(!report.services.daemon_reloaded);

        assert_eq!(std::fs::read(root.join("genesis.ssz")).unwrap(), vec![7u8; 4]);
        assert!(dir.path().join("systemd-user").join("zond-beacon.service").is_file());

        let written = std::fs::read_to_string(root.join(REPORT_FILE)).unwrap();
        assert!(written.starts_with("# zond-setup install report"));
        assert!(written.contains("[meta]"));
        assert!(written.contains("validator"));

        assert_eq!(
            prompter.asked[..2],
            [Question::WriteServiceUnits, Question::ReloadDaemon]
        );
    }
}
