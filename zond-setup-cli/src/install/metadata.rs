//! Genesis and chain-config downloads
//!
//! No checksum is verified: integrity rests on HTTPS, and a corrupt file only
//! surfaces when beacon-chain rejects it at startup.

use crate::install::error::{Flow, StageResult};
use crate::install::runner::{Step, StepRunner};
use std::path::Path;
use zond_setup_lib::InstallerConfig;

fn download_step(url: &str, file: &str, root: &Path) -> Step {
    Step::new(
        format!("Downloading {file}"),
        format!("curl -fsSL -o {file} {url}"),
    )
    .in_dir(root)
}

/// The two download steps, genesis first
pub fn metadata_steps(config: &InstallerConfig, root: &Path) -> Vec<Step> {
    let meta = &config.metadata;
    vec![
        download_step(&meta.genesis_url, &meta.genesis_file, root),
        download_step(&meta.chain_config_url, &meta.chain_config_file, root),
    ]
}

/// Metadata stage
pub fn fetch_metadata(runner: &StepRunner, config: &InstallerConfig, root: &Path) -> StageResult {
    for step in metadata_steps(config, root) {
        runner.run(&step)?;
    }
    Ok(Flow::Continue)
}
