//! Node installer stages
//!
//! Runs strictly top to bottom:
//! - Preflight (OS identity, CPU, RAM, storage)
//! - Install root preparation (wipe-and-recreate or stop)
//! - apt packages and the Go toolchain
//! - go-zond and qrysm builds
//! - Genesis/config downloads and wrapper scripts
//! - Artifact verification, optional systemd user services, report

pub mod driver;
pub mod error;
pub mod metadata;
pub mod preflight;
pub mod prompt;
pub mod report;
pub mod runner;
pub mod services;
pub mod sources;
pub mod system;
pub mod toolchain;
pub mod verify;

pub use driver::{InstallOptions, Installer, Outcome};
pub use error::{Flow, InstallError, StageResult};
pub use preflight::{PreflightDecision, PreflightVerdict, evaluate};
pub use prompt::{AssumeYes, Prompter, Question, ScriptedPrompter, TerminalPrompter};
pub use runner::{SessionEnv, Step, StepLog, StepRunner};
