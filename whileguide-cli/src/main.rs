//! whileguide CLI - terminal front end for the `while` loop guide
//!
//! Shows the guide's tabs (theory, exercises, solutions), copies code
//! samples to the clipboard, runs an interactive session, and manages
//! saved progress and configuration.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use whileguide_core::GuideConfig;

mod commands;
mod config;
mod guide;
mod tracing_setup;
mod ui;

#[derive(Parser, Debug)]
#[command(
    name = "whileguide",
    author,
    version,
    about = "Interactive guide to the while loop: theory, exercises and solutions",
    long_about = "Browse the while-loop guide from the terminal. Tab content is loaded once \
                  and cached; code samples can be copied straight to the clipboard."
)]
struct Cli {
    /// Suppress progress spinners (for script consumption)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a tab (HTML, or plain text with --text)
    Show(commands::show::ShowArgs),
    /// List tabs, marking the current one
    Tabs(commands::tabs::TabsArgs),
    /// Copy a code sample from a tab to the clipboard
    Copy(commands::copy::CopyArgs),
    /// Interactive session reading commands from stdin
    Session(commands::session::SessionArgs),
    /// Show saved progress and analytics
    Stats(commands::stats::StatsArgs),
    /// Export saved progress and analytics to a JSON file
    Export(commands::export::ExportArgs),
    /// Turn persisted debug mode on or off
    Debug(commands::debug::DebugArgs),
    /// Manage whileguide configuration (init, path, show)
    Config(config::ConfigArgs),
    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)] // PowerShell is a proper noun, not a suffix
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_setup::init_tracing(&tracing_setup::TracingConfig { debug: cli.debug }).ok();
    ui::init_quiet_mode(cli.quiet);

    match cli.command {
        Commands::Show(args) => commands::run_show(args, load_config()?).await?,
        Commands::Tabs(args) => commands::run_tabs(args, load_config()?)?,
        Commands::Copy(args) => commands::run_copy(args, load_config()?).await?,
        Commands::Session(args) => commands::run_session(args, load_config()?).await?,
        Commands::Stats(args) => commands::run_stats(args, load_config()?)?,
        Commands::Export(args) => commands::run_export(args, load_config()?)?,
        Commands::Debug(args) => commands::run_debug(args, load_config()?)?,
        Commands::Config(args) => config::run_config(args)?,
        Commands::Completions(args) => run_completions(args)?,
    }
    Ok(())
}

fn load_config() -> Result<GuideConfig> {
    let config = GuideConfig::load().context("Failed to load whileguide config")?;
    debug!(
        storage = %config.storage.dir.display(),
        fetch_delay_ms = config.content.fetch_delay_ms,
        "config loaded"
    );
    Ok(config)
}

fn run_completions(args: CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as CompletionShell};
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    };

    generate(shell, &mut cmd, bin_name, &mut io::stdout());

    Ok(())
}
