//! zond-setup - QRL Zond node installer

use clap::Parser;
use tracing_subscriber::EnvFilter;

use zond_setup_cli::Cli;
use zond_setup_cli::commands::handle_setup_command;

fn main() {
    // Diagnostics go to stderr; RUST_LOG=debug shows every step as it runs
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match handle_setup_command(cli.resolved_command(), cli.config.as_deref()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {e:#}");
            1
        }
    };

    std::process::exit(code);
}
