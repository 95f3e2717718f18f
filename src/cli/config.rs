use anyhow::{Context, Result};
use std::path::Path;

use super::args::{ConfigCliArgs, ConfigCommand};
use crate::config::Config;

pub fn handle_config_command(override_path: Option<&Path>, args: ConfigCliArgs) -> Result<()> {
    let path = match override_path {
        Some(path) => path.to_path_buf(),
        None => Config::config_path()?,
    };

    match args.command {
        ConfigCommand::Path => {
            println!("{}", path.display());
        }
        ConfigCommand::Show => {
            let config = load_or_default(&path)?;
            let rendered =
                toml::to_string_pretty(&config).context("Failed to serialize config")?;
            println!("{rendered}");
        }
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                println!(
                    "Config already exists at {} (use --force to overwrite)",
                    path.display()
                );
                return Ok(());
            }
            Config::default().save_to(&path)?;
            println!("Wrote default config to {}", path.display());
        }
    }

    Ok(())
}

fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::load_from(path)
    } else {
        Ok(Config::default())
    }
}
