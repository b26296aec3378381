//! Show saved progress and analytics
//!
//! Command: stats

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use whileguide_core::storage::{self, PROGRESS_KEY};
use whileguide_core::utils::{format_number, time_ago};
use whileguide_core::{GuideConfig, Progress};

use crate::guide::Guide;

#[derive(Parser, Debug)]
pub struct StatsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run_stats(args: StatsArgs, config: GuideConfig) -> Result<()> {
    let guide = Guide::open(config);
    let progress: Option<Progress> =
        storage::load_json(guide.storage.as_ref(), PROGRESS_KEY, None);

    if args.json {
        let value = serde_json::json!({
            "version": guide.app.version(),
            "debug": guide.app.is_debug(),
            "currentTab": guide.navigation.load_saved_tab(),
            "progress": progress,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("WhileGuide v{}", guide.app.version());
    println!("Aba atual:    {}", guide.navigation.load_saved_tab());
    println!(
        "Debug:        {}",
        if guide.app.is_debug() { "on" } else { "off" }
    );

    let Some(progress) = progress else {
        println!("Nenhum progresso salvo.");
        return Ok(());
    };

    let saved = progress
        .saved_at()
        .map(|at| time_ago(at, Utc::now()))
        .unwrap_or_else(|| "desconhecido".to_string());
    println!("Salvo:        {}", saved);
    if let Some(tab) = &progress.current_tab {
        println!("Última aba:   {}", tab);
    }
    println!(
        "Visualizações: {}",
        format_number(progress.analytics.page_views as f64, 0)
    );
    println!(
        "Trocas de aba: {}",
        format_number(progress.analytics.tab_changes as f64, 0)
    );
    println!(
        "Códigos copiados: {}",
        format_number(progress.analytics.codes_copied as f64, 0)
    );
    Ok(())
}
