//! Render one tab
//!
//! Command: show

use anyhow::{anyhow, Result};
use clap::Parser;
use whileguide_core::{GuideConfig, PanelState};

use crate::guide::{panel_text, Guide};

#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Tab to show (teoria, exercicios, solucoes)
    pub tab: String,

    /// Print plain text instead of HTML
    #[arg(long)]
    pub text: bool,
}

pub async fn run_show(args: ShowArgs, config: GuideConfig) -> Result<()> {
    let mut guide = Guide::open(config);
    let tab = guide.parse_tab(&args.tab)?;
    guide.start();

    let panel = guide.open_tab(&tab).await?;
    let failure = match &panel.state {
        PanelState::Failed(message) => Some(message.clone()),
        _ => None,
    };

    if failure.is_none() {
        if args.text {
            println!("{}", panel_text(&panel.html()));
        } else {
            println!("{}", panel.html());
        }
    }

    guide.finish();

    match failure {
        Some(message) => Err(anyhow!(message)),
        None => Ok(()),
    }
}
