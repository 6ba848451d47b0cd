//! Environment snapshot: OS identity and hardware counters
//!
//! Parsing is kept separate from probing so the numeric handling can be tested
//! against fixture text instead of the build machine.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;
const KB_PER_GB: u64 = 1024 * 1024;

/// Detected machine characteristics, computed once per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSnapshot {
    pub os_id: String,
    pub os_version: String,
    pub cpu_cores: u64,
    pub memory_gb: u64,
    pub free_storage_gb: u64,
}

impl EnvironmentSnapshot {
    /// Inspect the running system. `storage_path` need not exist yet; its nearest
    /// existing ancestor is measured instead.
    pub fn detect(storage_path: &Path) -> Result<Self> {
        let os_release = std::fs::read_to_string("/etc/os-release")
            .context("Failed to read /etc/os-release")?;
        let os = parse_os_release(&os_release);

        let meminfo =
            std::fs::read_to_string("/proc/meminfo").context("Failed to read /proc/meminfo")?;
        let memory_gb = parse_meminfo_gb(&meminfo).context("MemTotal missing from /proc/meminfo")?;

        let free_storage_gb = free_storage_gb(storage_path)?;

        Ok(Self {
            os_id: os.get("ID").cloned().unwrap_or_default(),
            os_version: os.get("VERSION_ID").cloned().unwrap_or_default(),
            cpu_cores: num_cpus::get() as u64,
            memory_gb,
            free_storage_gb,
        })
    }
}

/// Parse `KEY=VALUE` lines, stripping one layer of single or double quotes
pub fn parse_os_release(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim();
            let unquoted = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            (key.trim().to_string(), unquoted.to_string())
        })
        .collect()
}

/// `MemTotal` in whole gigabytes (truncated)
pub fn parse_meminfo_gb(content: &str) -> Option<u64> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("MemTotal:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb / KB_PER_GB)
}

/// Free space available to unprivileged users, in whole gigabytes.
///
/// Relative paths are measured from the current directory.
pub fn free_storage_gb(path: &Path) -> Result<u64> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("Failed to read the current directory")?
            .join(path)
    };
    let existing = nearest_existing(&absolute);

    let stat = nix::sys::statvfs::statvfs(existing.as_path())
        .with_context(|| format!("statvfs failed for {}", existing.display()))?;

    #[allow(clippy::unnecessary_cast)]
    let bytes = stat.blocks_available() as u64 * stat.fragment_size() as u64;
    Ok(bytes / BYTES_PER_GB)
}

fn nearest_existing(path: &Path) -> PathBuf {
    path.ancestors()
        .find(|p| p.exists())
        .map_or_else(|| PathBuf::from("/"), Path::to_path_buf)
}
