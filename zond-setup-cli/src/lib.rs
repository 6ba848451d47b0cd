//! zond-setup: provisions a QRL Zond node (gzond, beacon-chain, validator)
//! on a supported Ubuntu host.

pub mod commands;
pub mod install;

use clap::Parser;
use std::path::PathBuf;

use commands::SetupCommands;

#[derive(Debug, Parser)]
#[clap(name = "zond-setup", version = zond_setup_lib::VERSION)]
#[clap(about = "Install and configure a QRL Zond execution client, beacon chain and validator")]
pub struct Cli {
    /// Installer config file (TOML); defaults to ~/.config/zond-setup/config.toml when present
    #[clap(long, global = true, env = "ZOND_SETUP_CONFIG")]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Option<SetupCommands>,
}

impl Cli {
    /// The subcommand to run; a bare `zond-setup` installs
    pub fn resolved_command(&self) -> SetupCommands {
        self.command
            .clone()
            .unwrap_or_else(|| SetupCommands::Install(commands::InstallArgs::default()))
    }
}
