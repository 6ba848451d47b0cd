//! Stage results and the installer's error taxonomy

use snafu::Snafu;
use std::path::PathBuf;

/// What the driver should do after a stage returns successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Proceed to the next stage
    Continue,
    /// Stop here and exit 0 (the user declined something non-fatal)
    Halt,
}

/// Result of one installer stage
pub type StageResult = Result<Flow, InstallError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum InstallError {
    #[snafu(display(
        "Unsupported operating system: found '{found_id} {found_version}', this installer requires '{expected_id} {expected_version}'"
    ))]
    UnsupportedOs {
        expected_id: String,
        expected_version: String,
        found_id: String,
        found_version: String,
    },

    #[snafu(display("Insufficient CPU: {cores} cores detected, at least {required} required"))]
    InsufficientCpu { cores: u64, required: u64 },

    #[snafu(display("Insufficient RAM: {memory_gb} GB detected, at least {required} GB required"))]
    InsufficientMemory { memory_gb: u64, required: u64 },

    #[snafu(display(
        "Installation aborted: {free_gb} GB free storage is below the recommended {required} GB"
    ))]
    StorageDeclined { free_gb: u64, required: u64 },

    #[snafu(display("Step failed: {description} (exit code {code}, log: {})", log.display()))]
    StepFailed {
        description: String,
        code: i32,
        log: PathBuf,
    },

    #[snafu(display("Could not obtain administrator privileges: {reason}"))]
    PrivilegeUnavailable { reason: String },

    #[snafu(display("Installation incomplete, missing executables: {}", missing.join(", ")))]
    MissingArtifacts { missing: Vec<String> },

    #[snafu(display("Failed to {action}: {source}"))]
    Io {
        action: String,
        source: std::io::Error,
    },

    #[snafu(display("Failed to {action}: {source}"))]
    Support {
        action: String,
        #[snafu(source(from(anyhow::Error, Into::into)))]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl InstallError {
    /// Process exit status for this error; failed steps pass their own code through
    pub fn exit_code(&self) -> i32 {
        match self {
            InstallError::StepFailed { code, .. } => *code,
            _ => 1,
        }
    }
}
