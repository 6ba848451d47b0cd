//! Preflight checks: OS identity and hardware minimums
//!
//! `evaluate` and `PreflightVerdict::decision` are pure; only `run_preflight`
//! talks to the prompter.

use crate::install::error::{Flow, InstallError, StageResult};
use crate::install::prompt::{Prompter, Question};
use zond_setup_lib::EnvironmentSnapshot;
use zond_setup_lib::config::{RequirementsSection, TargetSection};

/// Per-check verdicts plus the figures they were computed from
#[derive(Debug, Clone)]
pub struct PreflightVerdict {
    pub snapshot: EnvironmentSnapshot,
    pub target: TargetSection,
    pub requirements: RequirementsSection,
    pub os_ok: bool,
    pub cpu_ok: bool,
    pub memory_ok: bool,
    pub storage_ok: bool,
}

/// What the verdict means for the run
#[derive(Debug)]
pub enum PreflightDecision {
    Pass,
    Fatal(InstallError),
    ConfirmLowStorage { free_gb: u64, required_gb: u64 },
}

/// Compare a snapshot against the target OS and thresholds
pub fn evaluate(
    snapshot: &EnvironmentSnapshot,
    target: &TargetSection,
    requirements: &RequirementsSection,
) -> PreflightVerdict {
    PreflightVerdict {
        snapshot: snapshot.clone(),
        target: target.clone(),
        requirements: requirements.clone(),
        os_ok: snapshot.os_id == target.os_id && snapshot.os_version == target.os_version,
        cpu_ok: snapshot.cpu_cores >= requirements.min_cpu_cores,
        memory_ok: snapshot.memory_gb >= requirements.min_memory_gb,
        storage_ok: snapshot.free_storage_gb >= requirements.min_storage_gb,
    }
}

impl PreflightVerdict {
    /// OS first, then CPU, then RAM; low storage is the only negotiable failure
    pub fn decision(&self) -> PreflightDecision {
        let snap = &self.snapshot;
        let req = &self.requirements;

        if !self.os_ok {
            return PreflightDecision::Fatal(InstallError::UnsupportedOs {
                expected_id: self.target.os_id.clone(),
                expected_version: self.target.os_version.clone(),
                found_id: snap.os_id.clone(),
                found_version: snap.os_version.clone(),
            });
        }
        if !self.cpu_ok {
            return PreflightDecision::Fatal(InstallError::InsufficientCpu {
                cores: snap.cpu_cores,
                required: req.min_cpu_cores,
            });
        }
        if !self.memory_ok {
            return PreflightDecision::Fatal(InstallError::InsufficientMemory {
                memory_gb: snap.memory_gb,
                required: req.min_memory_gb,
            });
        }
        if !self.storage_ok {
            return PreflightDecision::ConfirmLowStorage {
                free_gb: snap.free_storage_gb,
                required_gb: req.min_storage_gb,
            };
        }
        PreflightDecision::Pass
    }

    /// Print one line per check
    pub fn print(&self) {
        let snap = &self.snapshot;
        let req = &self.requirements;
        let mark = |ok: bool| if ok { "✅" } else { "❌" };

        println!("📋 System check:");
        println!(
            "  {} OS: {} {} (requires {} {})",
            mark(self.os_ok),
            snap.os_id,
            snap.os_version,
            self.target.os_id,
            self.target.os_version
        );
        println!(
            "  {} CPU: {} cores (requires {})",
            mark(self.cpu_ok),
            snap.cpu_cores,
            req.min_cpu_cores
        );
        println!(
            "  {} RAM: {} GB (requires {} GB)",
            mark(self.memory_ok),
            snap.memory_gb,
            req.min_memory_gb
        );
        println!(
            "  {} Storage: {} GB free (recommended {} GB)",
            if self.storage_ok { "✅" } else { "⚠️ " },
            snap.free_storage_gb,
            req.min_storage_gb
        );
    }
}

/// Preflight stage: fatal on OS/CPU/RAM, asks before continuing on low storage
pub fn run_preflight(verdict: &PreflightVerdict, prompter: &mut dyn Prompter) -> StageResult {
    verdict.print();

    match verdict.decision() {
        PreflightDecision::Pass => Ok(Flow::Continue),
        PreflightDecision::Fatal(err) => Err(err),
        PreflightDecision::ConfirmLowStorage {
            free_gb,
            required_gb,
        } => {
            let question = Question::ContinueLowStorage {
                free_gb,
                required_gb,
            };
            let proceed = prompter
                .confirm(&question)
                .map_err(|source| InstallError::Io {
                    action: "read answer".to_string(),
                    source,
                })?;

            if proceed {
                tracing::warn!(free_gb, required_gb, "continuing with low storage");
                Ok(Flow::Continue)
            } else {
                Err(InstallError::StorageDeclined {
                    free_gb,
                    required: required_gb,
                })
            }
        }
    }
}
