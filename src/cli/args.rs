use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::devices::MediaKind;

#[derive(Parser, Debug)]
#[command(name = "capturectl")]
#[command(about = "Coordinate a camera and microphone capture session", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Use this config file instead of the per-user one
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Run the session coordinator with an interactive control surface
    Run(RunCliArgs),
    /// List capture devices and which ones the selection policy picks
    Devices(DevicesCliArgs),
    /// Inspect or create the configuration file
    Config(ConfigCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug, Default)]
pub struct RunCliArgs {
    /// Comma-separated foreground events to replay instead of reading stdin
    /// (e.g. "show,hide,resume")
    #[arg(long)]
    pub script: Option<String>,
    /// Print status events as JSON lines
    #[arg(long)]
    pub json: bool,
}

#[derive(ClapArgs, Debug)]
pub struct DevicesCliArgs {
    /// Only list devices of this kind
    #[arg(short, long, value_enum)]
    pub kind: Option<KindArg>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum KindArg {
    Video,
    Audio,
}

impl From<KindArg> for MediaKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Video => MediaKind::Video,
            KindArg::Audio => MediaKind::Audio,
        }
    }
}

#[derive(ClapArgs, Debug)]
pub struct ConfigCliArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Print the configuration file location
    Path,
    /// Write a default configuration file (keeps an existing one unless --force)
    Init {
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_script() {
        let cli = Cli::parse_from(["capturectl", "-v", "run", "--script", "show,hide", "--json"]);
        assert!(cli.verbose);
        match cli.command {
            Some(CliCommand::Run(args)) => {
                assert_eq!(args.script.as_deref(), Some("show,hide"));
                assert!(args.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_devices_kind() {
        let cli = Cli::parse_from(["capturectl", "devices", "--kind", "audio"]);
        match cli.command {
            Some(CliCommand::Devices(args)) => {
                assert_eq!(args.kind.map(MediaKind::from), Some(MediaKind::Audio));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["capturectl", "config", "show", "--config", "/tmp/c.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(
            cli.command,
            Some(CliCommand::Config(ConfigCliArgs {
                command: ConfigCommand::Show
            }))
        ));
    }
}
