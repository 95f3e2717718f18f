pub mod args;
pub mod config;
pub mod devices;

pub use args::{Cli, CliCommand, ConfigCliArgs, ConfigCommand, DevicesCliArgs, RunCliArgs};
pub use config::handle_config_command;
pub use devices::handle_devices_command;
