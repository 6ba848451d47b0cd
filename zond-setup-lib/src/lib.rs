//! Core library for the zond-setup node installer
//!
//! Everything here is deterministic given its inputs:
//! - Installer configuration (defaults, TOML loading, path expansion)
//! - Environment snapshot parsing (os-release, meminfo, statvfs)
//! - Idempotent shell-profile edits
//! - Wrapper script and systemd user unit rendering
//!
//! Side-effecting orchestration lives in `zond-setup-cli`.

pub mod config;
pub mod environment;
pub mod profile;
pub mod render;

pub use config::InstallerConfig;
pub use environment::EnvironmentSnapshot;

/// Crate version, shared by every workspace member
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The five executables a finished install must contain; `[sources]` must build each one
pub const REQUIRED_BINARIES: [&str; 5] = ["gzond", "clef", "qrysmctl", "beacon-chain", "validator"];
