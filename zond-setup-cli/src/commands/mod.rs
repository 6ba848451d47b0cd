pub mod setup;

pub use setup::{InstallArgs, SetupCommands, handle_setup_command};
