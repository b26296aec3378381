//! Copy a code sample from a tab
//!
//! Command: copy

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use whileguide_core::copy::find_code_blocks;
use whileguide_core::GuideConfig;

use crate::guide::Guide;
use crate::ui;

#[derive(Parser, Debug)]
pub struct CopyArgs {
    /// Tab holding the code sample
    pub tab: String,

    /// Which code block, counting from 1
    #[arg(long, short = 'b', default_value_t = 1)]
    pub block: usize,

    /// Print the code instead of copying it
    #[arg(long)]
    pub print: bool,
}

pub async fn run_copy(args: CopyArgs, config: GuideConfig) -> Result<()> {
    let guide = Guide::open(config);
    let tab = guide.parse_tab(&args.tab)?;
    let index = args
        .block
        .checked_sub(1)
        .ok_or_else(|| anyhow!("Code blocks are numbered from 1"))?;

    let pb = ui::spinner(format!("Carregando {}...", tab));
    let content = guide.loader.request_content(&tab).await;
    ui::finish_clear(pb);
    let content = content.with_context(|| format!("Failed to load tab '{}'", tab))?;

    if args.print {
        let blocks = find_code_blocks(&content);
        let block = blocks.get(index).ok_or_else(|| {
            anyhow!(
                "Tab '{}' has {} code block(s), no block {}",
                tab,
                blocks.len(),
                args.block
            )
        })?;
        println!("{}", block.code);
        return Ok(());
    }

    let method = guide.copier.copy_block(&content, index)?;
    println!("✓ Copiado! ({})", method.as_str());
    Ok(())
}
