//! Wiring of the guide components for one CLI invocation

use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::broadcast;
use tracing::debug;
use whileguide_core::copy::extract_code_text;
use whileguide_core::{
    BuiltinSource, CodeCopyManager, ContentLoader, ContentSource, DirSource, EventBus,
    FileStorage, GuideConfig, GuideEvent, Panel, PanelRenderer, PanelState, TabId,
    TabNavigation, WhileGuideApp,
};

use crate::ui;

pub struct Guide {
    pub config: GuideConfig,
    pub storage: Arc<FileStorage>,
    pub bus: EventBus,
    pub loader: ContentLoader,
    pub navigation: TabNavigation,
    pub renderer: PanelRenderer,
    pub copier: CodeCopyManager,
    pub app: WhileGuideApp,
    events: broadcast::Receiver<GuideEvent>,
}

impl Guide {
    pub fn open(config: GuideConfig) -> Self {
        let storage = Arc::new(FileStorage::in_dir(&config.storage.dir));
        let bus = EventBus::new();

        let source: Arc<dyn ContentSource> = match &config.content.dir {
            Some(dir) => {
                debug!("Reading tab content from {}", dir.display());
                Arc::new(DirSource::new(dir.clone()))
            }
            None => Arc::new(BuiltinSource::new(config.fetch_delay())),
        };
        let loader = ContentLoader::new(source);

        let navigation = TabNavigation::with_defaults(storage.clone(), bus.clone());
        let renderer =
            PanelRenderer::with_button_text(loader.clone(), bus.clone(), &config.ui.button_text);
        let mut copier = CodeCopyManager::system(bus.clone());
        copier.set_button_text(&config.ui.button_text);
        let app = WhileGuideApp::new(storage.clone(), bus.clone())
            .with_progress_ttl(config.progress_ttl())
            .with_debug(config.ui.debug);

        // Subscribe before anything publishes so analytics sees every event.
        let events = bus.subscribe();

        Self {
            config,
            storage,
            bus,
            loader,
            navigation,
            renderer,
            copier,
            app,
            events,
        }
    }

    /// Start the app and pick the tab to open: restored progress, then the
    /// saved current tab, then the configured default.
    pub fn start(&mut self) -> TabId {
        let restored = self
            .app
            .start()
            .filter(|tab| self.navigation.tab_exists(tab));
        self.sync();

        restored.unwrap_or_else(|| {
            let saved = self.navigation.load_saved_tab();
            if saved != TabId::initial() {
                return saved;
            }
            self.config
                .default_tab()
                .ok()
                .filter(|tab| self.navigation.tab_exists(tab))
                .unwrap_or(saved)
        })
    }

    pub fn parse_tab(&self, name: &str) -> Result<TabId> {
        let tab = TabId::new(name.trim().to_lowercase())?;
        if !self.navigation.tab_exists(&tab) {
            return Err(anyhow!(
                "Unknown tab '{}'. Available: {}",
                tab,
                self.tab_names().join(", ")
            ));
        }
        Ok(tab)
    }

    pub fn tab_names(&self) -> Vec<String> {
        self.navigation
            .available_tabs()
            .iter()
            .map(|t| t.to_string())
            .collect()
    }

    /// Navigate to `tab` and render its panel
    pub async fn open_tab(&mut self, tab: &TabId) -> Result<Panel> {
        if !self.navigation.show_tab(tab) {
            return Err(anyhow!("Unknown tab '{}'", tab));
        }

        let pb = ui::spinner(format!("Carregando {}...", tab));
        let panel = self.renderer.handle_tab_changed(tab).await;
        match &panel.state {
            PanelState::Failed(message) => ui::finish_error(pb, message),
            _ => ui::finish_clear(pb),
        }

        self.sync();
        Ok(panel)
    }

    /// Feed queued bus events to the app
    pub fn sync(&mut self) {
        self.app.drain(&mut self.events);
    }

    /// The page goes away: the app saves progress on the hidden event
    pub fn finish(mut self) {
        self.bus.publish(GuideEvent::VisibilityChanged { hidden: true });
        self.sync();
    }
}

/// Plain-text rendering of panel HTML
pub fn panel_text(html: &str) -> String {
    extract_code_text(html)
}
