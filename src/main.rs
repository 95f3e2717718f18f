use anyhow::Result;
use capturectl::{
    app,
    cli::{handle_config_command, handle_devices_command, Cli, CliCommand},
    config::Config,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let load_config = || match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    match cli.command {
        Some(CliCommand::Version) => {
            println!("capturectl {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(CliCommand::Devices(args)) => handle_devices_command(&load_config()?, args),
        Some(CliCommand::Config(args)) => handle_config_command(cli.config.as_deref(), args),
        Some(CliCommand::Run(args)) => app::run_service(load_config()?, args.into()).await,
        None => app::run_service(load_config()?, app::RunOptions::default()).await,
    }
}
