//! Interactive session driven by stdin
//!
//! Command: session
//!
//! Each line is one command: a tab name, `left`/`right`/`home`/`end`,
//! `reload`, `copy N`, `stats`, `help` or `quit`. Navigation goes through
//! the event bus; a background renderer loads the panel and the session
//! prints it once `ContentLoaded` (or `ContentFailed`) arrives.

use anyhow::{anyhow, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::warn;
use whileguide_core::{GuideConfig, GuideEvent, NavKey, PanelState, TabId};

use crate::guide::{panel_text, Guide};

const HELP: &str = "\
Comandos:
  teoria | exercicios | solucoes   abrir uma aba
  left | right | home | end        navegar entre abas
  reload                           recarregar a aba atual
  copy N                           copiar o N-ésimo bloco de código
  stats                            mostrar estatísticas
  help                             esta ajuda
  quit                             sair";

#[derive(Parser, Debug)]
pub struct SessionArgs {
    /// Print panels as HTML instead of plain text
    #[arg(long)]
    pub html: bool,
}

enum Step {
    Continue,
    Quit,
}

pub async fn run_session(args: SessionArgs, config: GuideConfig) -> Result<()> {
    let mut guide = Guide::open(config);
    let mut rx = guide.bus.subscribe();
    let listener = guide.renderer.listen();

    let initial = guide.start();
    guide.loader.preload(&initial).await.ok();
    guide.navigation.show_tab(&initial);
    print_panel(&guide, &initial, &mut rx, args.html).await;
    guide.sync();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match handle_line(&mut guide, line, &mut rx, args.html).await {
            Ok(Step::Continue) => {}
            Ok(Step::Quit) => break,
            Err(e) => eprintln!("✗ {}", e),
        }
        guide.sync();

        for notification in guide.app.notifications() {
            eprintln!("! {}", notification.message);
        }
    }

    listener.abort();
    guide.finish();
    Ok(())
}

async fn handle_line(
    guide: &mut Guide,
    line: &str,
    rx: &mut broadcast::Receiver<GuideEvent>,
    html: bool,
) -> Result<Step> {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default().to_lowercase();

    match command.as_str() {
        "quit" | "exit" | "q" => return Ok(Step::Quit),
        "help" | "?" => println!("{}", HELP),
        "stats" => {
            let analytics = guide.app.analytics();
            println!(
                "aba: {} | visualizações: {} | trocas: {} | cópias: {}",
                guide.navigation.current_tab(),
                analytics.page_views,
                analytics.tab_changes,
                analytics.codes_copied
            );
        }
        "reload" => {
            let tab = guide.navigation.current_tab().clone();
            let panel = guide.renderer.retry(&tab).await;
            discard_pending(rx);
            println!("{}", render(&panel.html(), html));
        }
        "copy" => {
            let n: usize = parts
                .next()
                .ok_or_else(|| anyhow!("Uso: copy N"))?
                .parse()
                .map_err(|_| anyhow!("Uso: copy N"))?;
            let index = n.checked_sub(1).ok_or_else(|| anyhow!("Uso: copy N (N >= 1)"))?;

            let tab = guide.navigation.current_tab().clone();
            let panel = guide
                .renderer
                .panel(&tab)
                .ok_or_else(|| anyhow!("A aba '{}' ainda não foi carregada", tab))?;
            let method = guide.copier.copy_block(&panel.html(), index)?;
            println!("✓ Copiado! ({})", method.as_str());
        }
        other => {
            discard_pending(rx);
            let shown = match NavKey::parse(other) {
                Some(key) => guide.navigation.handle_key(key),
                None => {
                    let tab = guide.parse_tab(other)?;
                    guide.navigation.show_tab(&tab).then_some(tab)
                }
            };
            if let Some(tab) = shown {
                print_panel(guide, &tab, rx, html).await;
            }
        }
    }

    Ok(Step::Continue)
}

/// Wait for the renderer to finish `tab`, then print its panel
async fn print_panel(
    guide: &Guide,
    tab: &TabId,
    rx: &mut broadcast::Receiver<GuideEvent>,
    html: bool,
) {
    loop {
        match rx.recv().await {
            Ok(GuideEvent::ContentLoaded { tab: loaded, .. }) if &loaded == tab => break,
            Ok(GuideEvent::ContentFailed { tab: failed, .. }) if &failed == tab => break,
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => warn!("Session lagged, skipped {} events", skipped),
            Err(RecvError::Closed) => return,
        }
    }

    let Some(panel) = guide.renderer.panel(tab) else {
        return;
    };
    println!("── {} ──", tab);
    match &panel.state {
        PanelState::Failed(message) => {
            eprintln!("✗ {} (use 'reload' para tentar novamente)", message)
        }
        _ => println!("{}", render(&panel.html(), html)),
    }
}

fn render(panel_html: &str, html: bool) -> String {
    if html {
        panel_html.to_string()
    } else {
        panel_text(panel_html)
    }
}

fn discard_pending(rx: &mut broadcast::Receiver<GuideEvent>) {
    loop {
        match rx.try_recv() {
            Ok(_) | Err(TryRecvError::Lagged(_)) => {}
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
}
