//! zond-setup commands
//!
//! - install: full provisioning run (default when no subcommand is given)
//! - check: preflight only
//! - render: wrapper scripts and unit files for the effective config
//! - config: print the effective config

use crate::install::preflight::{PreflightDecision, evaluate};
use crate::install::services::systemd_user_dir;
use crate::install::{
    AssumeYes, InstallOptions, Installer, Outcome, Prompter, StepLog, StepRunner,
    TerminalPrompter,
};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};
use zond_setup_lib::render::{service_units, wrapper_scripts};
use zond_setup_lib::{EnvironmentSnapshot, InstallerConfig};

#[derive(Debug, Subcommand, Clone)]
pub enum SetupCommands {
    /// Install gzond, qrysm (beacon-chain, validator, qrysmctl) and their services
    #[clap(alias = "run")]
    Install(InstallArgs),

    /// Check OS and hardware requirements only
    Check,

    /// Render wrapper scripts and systemd units without installing anything
    Render {
        /// Write files into this directory instead of printing them
        #[clap(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Debug, Args, Clone, Default)]
pub struct InstallArgs {
    /// Answer yes to every question except deleting an existing install
    #[clap(short, long)]
    pub yes: bool,

    /// With --yes, also delete and rebuild an existing install directory
    #[clap(long, requires = "yes")]
    pub force_reinstall: bool,

    /// Plain progress lines instead of spinners
    #[clap(long)]
    pub no_progress: bool,

    /// Do not offer systemd user services
    #[clap(long)]
    pub skip_services: bool,
}

/// Handle a command; the returned value is the process exit code
pub fn handle_setup_command(cmd: SetupCommands, config_path: Option<&Path>) -> Result<i32> {
    match cmd {
        SetupCommands::Install(args) => install(&args, config_path),
        SetupCommands::Check => check_only(config_path),
        SetupCommands::Render { out } => render(config_path, out.as_deref()),
        SetupCommands::Config => print_config(config_path),
    }
}

fn install(args: &InstallArgs, config_path: Option<&Path>) -> Result<i32> {
    let (config, source) = InstallerConfig::load_effective(config_path)?;
    let root = config.install_root();

    println!("⛓️  zond-setup {} - QRL Zond node installer", zond_setup_lib::VERSION);
    println!("⚙️  Config: {source}");
    println!("📁 Install dir: {}", root.display());
    println!();

    let snapshot = match EnvironmentSnapshot::detect(&root) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            eprintln!("❌ Could not inspect this machine: {e:#}");
            return Ok(1);
        }
    };
    tracing::debug!(?snapshot, "environment detected");
    let verdict = evaluate(&snapshot, &config.target, &config.requirements);

    let log = match StepLog::create() {
        Ok(log) => log,
        Err(e) => {
            eprintln!("❌ {e}");
            return Ok(e.exit_code());
        }
    };
    let progress = !args.no_progress && console::Term::stdout().is_term();
    let runner = StepRunner::new(log, progress);

    let mut prompter: Box<dyn Prompter> = if args.yes {
        Box::new(AssumeYes {
            force_reinstall: args.force_reinstall,
        })
    } else {
        Box::new(TerminalPrompter)
    };

    let options = InstallOptions {
        skip_services: args.skip_services,
        unit_dir: systemd_user_dir(),
    };

    let mut installer = Installer::new(&config, source, prompter.as_mut(), runner, options);
    match installer.run(&verdict) {
        Ok(Outcome::Installed(_)) => {
            println!();
            println!("✅ Installation complete!");
            Ok(0)
        }
        Ok(Outcome::Halted) => Ok(0),
        Err(e) => {
            eprintln!();
            eprintln!("❌ {e}");
            Ok(e.exit_code())
        }
    }
}

fn check_only(config_path: Option<&Path>) -> Result<i32> {
    let (config, _) = InstallerConfig::load_effective(config_path)?;
    let snapshot = EnvironmentSnapshot::detect(&config.install_root())
        .context("Failed to inspect this machine")?;

    let verdict = evaluate(&snapshot, &config.target, &config.requirements);
    verdict.print();
    println!();

    match verdict.decision() {
        PreflightDecision::Pass => {
            println!("✅ All requirements met!");
            Ok(0)
        }
        PreflightDecision::ConfirmLowStorage { .. } => {
            println!("⚠️  Storage below the recommendation; install will ask before continuing");
            Ok(0)
        }
        PreflightDecision::Fatal(e) => {
            eprintln!("❌ {e}");
            Ok(e.exit_code())
        }
    }
}

fn render(config_path: Option<&Path>, out: Option<&Path>) -> Result<i32> {
    let (config, _) = InstallerConfig::load_effective(config_path)?;
    let root = config.install_root();

    let mut files = wrapper_scripts(&config, &root)?;
    files.extend(service_units(&config, &root)?);

    if let Some(dir) = out {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        for file in &files {
            let path = file.write_to(dir)?;
            println!("✨ {}", path.display());
        }
    } else {
        for (i, file) in files.iter().enumerate() {
            if i > 0 {
                println!();
            }
            println!("# ==> {} <==", file.name);
            print!("{}", file.contents);
        }
    }

    Ok(0)
}

fn print_config(config_path: Option<&Path>) -> Result<i32> {
    let (config, source) = InstallerConfig::load_effective(config_path)?;
    println!("# Effective zond-setup config ({source})");
    print!("{}", config.to_toml()?);
    Ok(0)
}
