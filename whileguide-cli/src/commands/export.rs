//! Export saved progress and analytics
//!
//! Command: export

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use whileguide_core::GuideConfig;

use crate::guide::Guide;

#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Directory for the export file (default: current directory)
    #[arg(long = "out", value_name = "DIR")]
    pub output: Option<PathBuf>,
}

pub fn run_export(args: ExportArgs, config: GuideConfig) -> Result<()> {
    let guide = Guide::open(config);
    let dir = match args.output {
        Some(dir) => dir,
        None => std::env::current_dir().context("Could not determine current directory")?,
    };

    let path = guide
        .app
        .export_user_data(&dir)
        .with_context(|| format!("Failed to export into {}", dir.display()))?;

    println!("{}", path.display());
    Ok(())
}
