//! Installer configuration
//!
//! Every value the installer used to hard-code (target OS, thresholds, repository
//! URLs, bootstrap peers, unit names) lives here. All fields default, so a user
//! config file only needs the keys it overrides.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Top-level configuration, matching `config.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// Install root, `~` is expanded
    pub install_dir: String,
    pub target: TargetSection,
    pub requirements: RequirementsSection,
    pub packages: PackagesSection,
    pub toolchain: ToolchainSection,
    pub sources: SourcesSection,
    pub metadata: MetadataSection,
    pub network: NetworkSection,
    pub services: ServicesSection,
}

/// Supported operating system, compared against /etc/os-release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSection {
    pub os_id: String,
    pub os_version: String,
}

/// Hardware minimums
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequirementsSection {
    pub min_cpu_cores: u64,
    pub min_memory_gb: u64,
    pub min_storage_gb: u64,
}

/// System packages installed through apt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagesSection {
    pub names: Vec<String>,
}

/// Go version manager and the pinned toolchain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSection {
    /// Name the manager answers to once its script is sourced
    pub manager: String,
    pub installer_url: String,
    /// Script that defines the manager in a shell session
    pub manager_script: String,
    pub version: String,
    /// Shell profile receiving `profile_lines`
    pub profile: String,
    pub profile_lines: Vec<String>,
}

/// Upstream repositories and what to build from them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesSection {
    pub clone_depth: u32,
    pub execution_repo: String,
    pub execution_dir: String,
    pub execution_build: String,
    /// Directory inside the execution checkout where `execution_build` leaves binaries
    pub execution_output: String,
    pub execution_binaries: Vec<String>,
    pub consensus_repo: String,
    pub consensus_dir: String,
    /// Each name is compiled from `./cmd/<name>` straight into the install root
    pub consensus_binaries: Vec<String>,
}

/// Genesis snapshot and chain configuration downloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSection {
    pub genesis_url: String,
    pub genesis_file: String,
    pub chain_config_url: String,
    pub chain_config_file: String,
}

/// Runtime flags baked into the wrapper scripts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSection {
    pub network: String,
    pub chain_id: u64,
    pub http_api: Vec<String>,
    pub execution_datadir: String,
    pub beacon_datadir: String,
    pub execution_endpoint: String,
    pub jwt_secret: String,
    pub bootstrap_nodes: Vec<String>,
}

/// Wrapper script and systemd user unit naming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesSection {
    pub execution_script: String,
    pub beacon_script: String,
    pub execution_unit: String,
    pub beacon_unit: String,
    pub restart_sec: u32,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            install_dir: "~/theQRL".to_string(),
            target: TargetSection::default(),
            requirements: RequirementsSection::default(),
            packages: PackagesSection::default(),
            toolchain: ToolchainSection::default(),
            sources: SourcesSection::default(),
            metadata: MetadataSection::default(),
            network: NetworkSection::default(),
            services: ServicesSection::default(),
        }
    }
}

impl Default for TargetSection {
    fn default() -> Self {
        Self {
            os_id: "ubuntu".to_string(),
            os_version: "22.04".to_string(),
        }
    }
}

impl Default for RequirementsSection {
    fn default() -> Self {
        Self {
            min_cpu_cores: 2,
            min_memory_gb: 2,
            min_storage_gb: 50,
        }
    }
}

impl Default for PackagesSection {
    fn default() -> Self {
        Self {
            names: strings(&[
                "build-essential",
                "git",
                "curl",
                "wget",
                "bison",
                "make",
                "gcc",
                "bsdmainutils",
            ]),
        }
    }
}

impl Default for ToolchainSection {
    fn default() -> Self {
        Self {
            manager: "gvm".to_string(),
            installer_url:
                "https://raw.githubusercontent.com/moovweb/gvm/master/binscripts/gvm-installer"
                    .to_string(),
            manager_script: "~/.gvm/scripts/gvm".to_string(),
            version: "go1.22.12".to_string(),
            profile: "~/.bashrc".to_string(),
            profile_lines: strings(&[
                "export GOPATH=\"$HOME/go\"",
                "export PATH=\"$PATH:$GOPATH/bin\"",
            ]),
        }
    }
}

impl Default for SourcesSection {
    fn default() -> Self {
        Self {
            clone_depth: 1,
            execution_repo: "https://github.com/theQRL/go-zond.git".to_string(),
            execution_dir: "go-zond".to_string(),
            execution_build: "make all".to_string(),
            execution_output: "build/bin".to_string(),
            execution_binaries: strings(&["gzond", "clef"]),
            consensus_repo: "https://github.com/theQRL/qrysm.git".to_string(),
            consensus_dir: "qrysm".to_string(),
            consensus_binaries: strings(&["qrysmctl", "beacon-chain", "validator"]),
        }
    }
}

impl Default for MetadataSection {
    fn default() -> Self {
        Self {
            genesis_url:
                "https://github.com/theQRL/go-zond-metadata/raw/main/testnet/betanet/genesis.ssz"
                    .to_string(),
            genesis_file: "genesis.ssz".to_string(),
            chain_config_url:
                "https://github.com/theQRL/go-zond-metadata/raw/main/testnet/betanet/config.yml"
                    .to_string(),
            chain_config_file: "config.yml".to_string(),
        }
    }
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            network: "betanet".to_string(),
            chain_id: 32382,
            http_api: strings(&["web3", "net", "personal", "zond", "engine"]),
            execution_datadir: "gzonddata".to_string(),
            beacon_datadir: "beacondata".to_string(),
            execution_endpoint: "http://localhost:8551".to_string(),
            jwt_secret: "gzonddata/gzond/jwtsecret".to_string(),
            bootstrap_nodes: strings(&[
                "enr:-MK4QJoGn1wk2eakGnxFcMJ9mm1zbGQXq1WUmRbXR3g6bvMBLE5gX1kNmVBRpQEa9sB6dLBRZmMT0ZEAyDEtMX9DqBWGAYjqsDxOh2F0dG5ldHOIAAAAAAAAAACEZXRoMpBWKS_6IAAAk___________gmlkgnY0gmlwhC1MJ0KJc2VjcDI1NmsxoQJmbOHmJZIsnNiLDJXeFiNCl3_JbVmmmCYYeKMXf8PgsYhzeW5jbmV0cwCDdGNwgjLIg3VkcIIu4A",
                "enr:-MK4QKxIa_SrvOVMaxQG4EvUlwdnH3t1aBNwULdIgJtO3uQuGWq4vRXEFrdLrCdiTg3BBTPH6AGYVPzZkxy5QMhjtGGGAYjqsEB8h2F0dG5ldHOIAAAAAAAAAACEZXRoMpBWKS_6IAAAk___________gmlkgnY0gmlwhC1MJ0KJc2VjcDI1NmsxoQPnoA4vzDSqZvkVXHvJbeWwRjUGKnUHIcGPGiW4Ezz4T4hzeW5jbmV0cwCDdGNwgjLIg3VkcIIu4A",
            ]),
        }
    }
}

impl Default for ServicesSection {
    fn default() -> Self {
        Self {
            execution_script: "start-gzond.sh".to_string(),
            beacon_script: "start-beacon.sh".to_string(),
            execution_unit: "zond-gzond.service".to_string(),
            beacon_unit: "zond-beacon.service".to_string(),
            restart_sec: 10,
        }
    }
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Explicit(PathBuf),
    UserFile(PathBuf),
    BuiltIn,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Explicit(path) | ConfigSource::UserFile(path) => {
                write!(f, "{}", path.display())
            }
            ConfigSource::BuiltIn => write!(f, "built-in defaults"),
        }
    }
}

impl InstallerConfig {
    /// Parse a TOML document; absent keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse installer config")?;
        config.validate()?;
        Ok(config)
    }

    /// Every required executable must come out of one of the builds
    pub fn validate(&self) -> Result<()> {
        let built = self.built_binaries();
        let unbuilt: Vec<&str> = crate::REQUIRED_BINARIES
            .into_iter()
            .filter(|name| !built.iter().any(|b| b == name))
            .collect();
        if !unbuilt.is_empty() {
            bail!(
                "[sources] builds no {}; the node needs {}",
                unbuilt.join(", "),
                crate::REQUIRED_BINARIES.join(", ")
            );
        }
        Ok(())
    }

    /// Executables the builds leave in the install root, execution client first
    pub fn built_binaries(&self) -> Vec<String> {
        let src = &self.sources;
        src.execution_binaries
            .iter()
            .chain(&src.consensus_binaries)
            .cloned()
            .collect()
    }

    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content).with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Resolve the effective config: explicit path, then the user file, then defaults
    pub fn load_effective(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, ConfigSource::Explicit(path.to_path_buf())));
        }

        if let Some(path) = Self::user_config_path().filter(|p| p.is_file()) {
            tracing::debug!(path = %path.display(), "loading user config");
            let config = Self::load(&path)?;
            return Ok((config, ConfigSource::UserFile(path)));
        }

        Ok((Self::default(), ConfigSource::BuiltIn))
    }

    /// `<config_dir>/zond-setup/config.toml`
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("zond-setup").join("config.toml"))
    }

    /// Serialize back to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize installer config")
    }

    /// Install root with `~` and `$VARS` expanded
    pub fn install_root(&self) -> PathBuf {
        expand_path(&self.install_dir)
    }

    /// Shell profile path with `~` expanded
    pub fn profile_path(&self) -> PathBuf {
        expand_path(&self.toolchain.profile)
    }

    /// Version manager script path with `~` expanded
    pub fn manager_script_path(&self) -> PathBuf {
        expand_path(&self.toolchain.manager_script)
    }
}

/// Expand `~` and environment variables; unknown variables are left as written
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}
