//! Wrapper script and systemd user unit rendering
//!
//! Output depends only on the config and the install root, so repeated runs
//! produce byte-identical files.

use crate::config::InstallerConfig;
use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tera::Tera;

const WRAPPER_TEMPLATE: &str = r#"#!/bin/bash
# Generated by zond-setup. Edit the installer config and re-run instead of editing this file.
cd "{{ install_dir }}" || exit 1
exec ./{{ binary }}{% for arg in args %} \
  {{ arg }}{% endfor %}
"#;

const UNIT_TEMPLATE: &str = r"[Unit]
Description={{ description }}
After={{ after }}
{% if wants %}Wants={{ wants }}
{% endif %}
[Service]
Type=simple
WorkingDirectory={{ working_dir }}
ExecStart={{ exec_start }}
Restart=on-failure
RestartSec={{ restart_sec }}

[Install]
WantedBy=default.target
";

/// A generated file, ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub name: String,
    pub contents: String,
    pub executable: bool,
}

impl RenderedFile {
    /// Write into `dir`, replacing any previous copy; executables get mode 0755
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.name);
        fs::write(&path, &self.contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        if self.executable {
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
                .with_context(|| format!("Failed to chmod {}", path.display()))?;
        }

        Ok(path)
    }
}

/// gzond flags
pub fn execution_args(config: &InstallerConfig) -> Vec<String> {
    let net = &config.network;
    vec![
        "--nat=extip:0.0.0.0".to_string(),
        format!("--{}", net.network),
        "--http".to_string(),
        format!("--http.api={}", net.http_api.join(",")),
        format!("--datadir={}", net.execution_datadir),
        "--syncmode=full".to_string(),
        "--snapshot=false".to_string(),
    ]
}

/// beacon-chain flags, one `--bootstrap-node` per configured peer
pub fn beacon_args(config: &InstallerConfig) -> Vec<String> {
    let net = &config.network;
    let meta = &config.metadata;
    let mut args = vec![
        format!("--datadir={}", net.beacon_datadir),
        "--min-sync-peers=1".to_string(),
        format!("--genesis-state={}", meta.genesis_file),
        format!("--chain-config-file={}", meta.chain_config_file),
        format!("--config-file={}", meta.chain_config_file),
        format!("--chain-id={}", net.chain_id),
        format!("--execution-endpoint={}", net.execution_endpoint),
        "--accept-terms-of-use".to_string(),
        format!("--jwt-secret={}", net.jwt_secret),
        "--contract-deployment-block=0".to_string(),
        "--minimum-peers-per-subnet=0".to_string(),
    ];
    args.extend(
        net.bootstrap_nodes
            .iter()
            .map(|node| format!("--bootstrap-node={node}")),
    );
    args
}

fn render_wrapper(install_root: &Path, name: &str, binary: &str, args: &[String]) -> Result<RenderedFile> {
    let mut context = tera::Context::new();
    context.insert("install_dir", &install_root.display().to_string());
    context.insert("binary", binary);
    context.insert("args", args);

    let contents = Tera::one_off(WRAPPER_TEMPLATE, &context, false)
        .with_context(|| format!("Failed to render {name}"))?;

    Ok(RenderedFile {
        name: name.to_string(),
        contents,
        executable: true,
    })
}

/// `start-gzond.sh`
pub fn execution_wrapper(config: &InstallerConfig, install_root: &Path) -> Result<RenderedFile> {
    render_wrapper(
        install_root,
        &config.services.execution_script,
        "gzond",
        &execution_args(config),
    )
}

/// `start-beacon.sh`
pub fn beacon_wrapper(config: &InstallerConfig, install_root: &Path) -> Result<RenderedFile> {
    render_wrapper(
        install_root,
        &config.services.beacon_script,
        "beacon-chain",
        &beacon_args(config),
    )
}

/// Both wrapper scripts, execution client first
pub fn wrapper_scripts(config: &InstallerConfig, install_root: &Path) -> Result<Vec<RenderedFile>> {
    Ok(vec![
        execution_wrapper(config, install_root)?,
        beacon_wrapper(config, install_root)?,
    ])
}

/// Path as systemd reads it: `%` would start a specifier
fn unit_path(path: &Path) -> String {
    path.display().to_string().replace('%', "%%")
}

/// Double-quoted for command lines such as `ExecStart=`, which split on spaces
fn quoted_unit_path(path: &Path) -> String {
    let escaped = unit_path(path).replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

struct UnitLayout<'a> {
    name: &'a str,
    description: &'a str,
    after: String,
    wants: Option<&'a str>,
    script: &'a str,
}

fn render_unit(config: &InstallerConfig, install_root: &Path, unit: &UnitLayout<'_>) -> Result<RenderedFile> {
    let mut context = tera::Context::new();
    context.insert("description", unit.description);
    context.insert("after", &unit.after);
    context.insert("wants", &unit.wants);
    context.insert("working_dir", &unit_path(install_root));
    context.insert("exec_start", &quoted_unit_path(&install_root.join(unit.script)));
    context.insert("restart_sec", &config.services.restart_sec);

    let contents = Tera::one_off(UNIT_TEMPLATE, &context, false)
        .with_context(|| format!("Failed to render {}", unit.name))?;

    Ok(RenderedFile {
        name: unit.name.to_string(),
        contents,
        executable: false,
    })
}

/// The two systemd user units; the beacon unit orders itself after the execution unit
pub fn service_units(config: &InstallerConfig, install_root: &Path) -> Result<Vec<RenderedFile>> {
    let services = &config.services;

    let execution = render_unit(
        config,
        install_root,
        &UnitLayout {
            name: &services.execution_unit,
            description: "QRL Zond execution client (gzond)",
            after: "network-online.target".to_string(),
            wants: None,
            script: &services.execution_script,
        },
    )?;

    let beacon = render_unit(
        config,
        install_root,
        &UnitLayout {
            name: &services.beacon_unit,
            description: "QRL Zond beacon chain (qrysm)",
            after: format!("network-online.target {}", services.execution_unit),
            wants: Some(&services.execution_unit),
            script: &services.beacon_script,
        },
    )?;

    Ok(vec![execution, beacon])
}
