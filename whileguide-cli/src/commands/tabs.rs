//! List the guide's tabs
//!
//! Command: tabs

use anyhow::Result;
use clap::Parser;
use whileguide_core::GuideConfig;

use crate::guide::Guide;

#[derive(Parser, Debug)]
pub struct TabsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run_tabs(args: TabsArgs, config: GuideConfig) -> Result<()> {
    let guide = Guide::open(config);
    let current = guide.navigation.load_saved_tab();

    if args.json {
        let tabs: Vec<_> = guide
            .navigation
            .available_tabs()
            .iter()
            .map(|tab| serde_json::json!({ "tab": tab, "current": tab == &current }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&tabs)?);
        return Ok(());
    }

    for tab in guide.navigation.available_tabs() {
        let marker = if tab == &current { "*" } else { " " };
        println!("{} {}", marker, tab);
    }
    Ok(())
}
