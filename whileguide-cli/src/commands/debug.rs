//! Toggle persisted debug mode
//!
//! Command: debug

use anyhow::Result;
use clap::{Parser, ValueEnum};
use whileguide_core::GuideConfig;

use crate::guide::Guide;

#[derive(Parser, Debug)]
pub struct DebugArgs {
    #[arg(value_enum)]
    pub state: DebugState,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugState {
    On,
    Off,
}

pub fn run_debug(args: DebugArgs, config: GuideConfig) -> Result<()> {
    let mut guide = Guide::open(config);

    match args.state {
        DebugState::On => {
            guide.app.enable_debug()?;
            println!("Debug mode enabled");
        }
        DebugState::Off => {
            guide.app.disable_debug()?;
            println!("Debug mode disabled");
        }
    }
    Ok(())
}
