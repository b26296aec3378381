use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use whileguide_core::config::CONFIG_TEMPLATE;
use whileguide_core::GuideConfig;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a commented config template
    Init(InitArgs),
    /// Show config file path
    Path,
    /// Show the effective config (file, defaults and environment overrides)
    Show,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Force overwrite existing config
    #[arg(long, short)]
    pub force: bool,
}

pub fn run_config(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Init(args) => run_init(args),
        ConfigCommands::Path => run_path(),
        ConfigCommands::Show => run_show(),
    }
}

fn run_init(args: InitArgs) -> Result<()> {
    let config_path = GuideConfig::config_path();

    if config_path.exists() && !args.force {
        return Err(anyhow!(
            "Config already exists at {:?}\n\nUse --force to overwrite",
            config_path
        ));
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(&config_path, CONFIG_TEMPLATE)
        .context(format!("Failed to write config file: {:?}", config_path))?;

    println!("✅ Created config at: {:?}", config_path);
    println!("\nNext steps:");
    println!("  1. Edit the config: $EDITOR {:?}", config_path);
    println!("  2. Run: whileguide config show");

    Ok(())
}

fn run_path() -> Result<()> {
    println!("{}", GuideConfig::config_path().display());
    Ok(())
}

fn run_show() -> Result<()> {
    let config = GuideConfig::load()?;
    let toml_str =
        toml::to_string_pretty(&config).context("Failed to serialize config to TOML")?;

    println!("{}", toml_str);
    Ok(())
}
