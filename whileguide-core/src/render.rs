//! Panel rendering
//!
//! Bridges navigation and the loader: on `TabChanged` the renderer asks the
//! [`ContentLoader`] for the tab, writes the result into that tab's
//! [`Panel`], attaches copy buttons, and announces `ContentLoaded` (or
//! `ContentFailed` with a retry affordance in the panel).

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::copy::{attach_copy_buttons, DEFAULT_BUTTON_TEXT};
use crate::events::{EventBus, GuideEvent};
use crate::loader::ContentLoader;
use crate::tab::TabId;

/// What a panel currently shows
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PanelState {
    #[default]
    Empty,
    Loading,
    Ready(String),
    Failed(String),
}

/// Container for one tab's content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    pub tab: TabId,
    pub state: PanelState,
}

impl Panel {
    /// Container name, `<tab>-content`
    pub fn container_id(&self) -> String {
        container_id(&self.tab)
    }

    /// HTML for the current state
    pub fn html(&self) -> String {
        match &self.state {
            PanelState::Empty => String::new(),
            PanelState::Loading => loading_html(),
            PanelState::Ready(html) => html.clone(),
            PanelState::Failed(message) => error_html(message),
        }
    }
}

pub fn container_id(tab: &TabId) -> String {
    format!("{}-content", tab)
}

pub fn loading_html() -> String {
    r#"<div class="loading-container">
    <div class="loading-spinner"></div>
    <p>Carregando conteúdo...</p>
</div>"#
        .to_string()
}

pub fn error_html(message: &str) -> String {
    format!(
        r#"<div class="error-container">
    <h3>❌ Erro ao carregar conteúdo</h3>
    <p>Ocorreu um erro: {}</p>
    <button class="retry-btn">Tentar novamente</button>
</div>"#,
        crate::utils::sanitize_string(message)
    )
}

struct RendererInner {
    loader: ContentLoader,
    bus: EventBus,
    button_text: String,
    panels: Mutex<BTreeMap<TabId, Panel>>,
}

/// Renders loader results into panels
#[derive(Clone)]
pub struct PanelRenderer {
    inner: Arc<RendererInner>,
}

impl PanelRenderer {
    pub fn new(loader: ContentLoader, bus: EventBus) -> Self {
        Self::with_button_text(loader, bus, DEFAULT_BUTTON_TEXT)
    }

    pub fn with_button_text(loader: ContentLoader, bus: EventBus, button_text: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RendererInner {
                loader,
                bus,
                button_text: button_text.into(),
                panels: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    fn panels(&self) -> MutexGuard<'_, BTreeMap<TabId, Panel>> {
        self.inner.panels.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_state(&self, tab: &TabId, state: PanelState) {
        self.panels().insert(
            tab.clone(),
            Panel {
                tab: tab.clone(),
                state,
            },
        );
    }

    /// Load `tab` into its panel. Returns the panel as rendered.
    pub async fn handle_tab_changed(&self, tab: &TabId) -> Panel {
        let loader = &self.inner.loader;

        if !loader.is_cached(tab) {
            self.set_state(tab, PanelState::Loading);
        }

        match loader.request_content(tab).await {
            Ok(content) => {
                // Explicitly attach affordances after every render.
                let html = attach_copy_buttons(&content, &self.inner.button_text);
                self.set_state(tab, PanelState::Ready(html));
                self.inner.bus.publish(GuideEvent::ContentLoaded {
                    tab: tab.clone(),
                    panel: container_id(tab),
                });
            }
            Err(e) => {
                warn!("Erro ao carregar conteúdo de {}: {}", tab, e);
                self.set_state(tab, PanelState::Failed(e.to_string()));
                self.inner.bus.publish(GuideEvent::ContentFailed {
                    tab: tab.clone(),
                    error: e.to_string(),
                });
            }
        }

        self.panel(tab).unwrap_or_else(|| Panel {
            tab: tab.clone(),
            state: PanelState::Empty,
        })
    }

    /// Invalidate and render again (the retry affordance)
    pub async fn retry(&self, tab: &TabId) -> Panel {
        self.inner.loader.invalidate(tab);
        self.handle_tab_changed(tab).await
    }

    pub fn panel(&self, tab: &TabId) -> Option<Panel> {
        self.panels().get(tab).cloned()
    }

    pub fn loader(&self) -> &ContentLoader {
        &self.inner.loader
    }

    /// React to `TabChanged` events on a background task. The renderer keeps
    /// the bus alive, so stop it by aborting the returned handle.
    ///
    /// Each change is handled on its own task so a slow tab never delays
    /// another; concurrent requests for one tab coalesce in the loader.
    pub fn listen(&self) -> JoinHandle<()> {
        let renderer = self.clone();
        let mut rx = self.inner.bus.subscribe();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(GuideEvent::TabChanged { tab, .. }) => {
                        let renderer = renderer.clone();
                        tokio::spawn(async move {
                            renderer.handle_tab_changed(&tab).await;
                        });
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Renderer lagged, skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => {
                        debug!("Event bus closed, renderer stopping");
                        break;
                    }
                }
            }
        })
    }
}

impl std::fmt::Debug for PanelRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelRenderer")
            .field("loader", &self.inner.loader)
            .field("panels", &self.panels().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BuiltinSource;

    fn tab(id: &str) -> TabId {
        TabId::new(id).unwrap()
    }

    fn renderer() -> (PanelRenderer, EventBus) {
        let bus = EventBus::new();
        let loader = ContentLoader::with_source(BuiltinSource::instant());
        (PanelRenderer::new(loader, bus.clone()), bus)
    }

    #[tokio::test]
    async fn ready_panel_has_copy_buttons() {
        let (renderer, bus) = renderer();
        let mut rx = bus.subscribe();

        let panel = renderer.handle_tab_changed(&tab("teoria")).await;

        match &panel.state {
            PanelState::Ready(html) => assert!(html.contains("class=\"copy-btn\"")),
            other => panic!("unexpected state {:?}", other),
        }
        assert_eq!(
            rx.recv().await.unwrap(),
            GuideEvent::ContentLoaded {
                tab: tab("teoria"),
                panel: "teoria-content".into()
            }
        );
    }

    #[tokio::test]
    async fn failure_renders_retry_affordance() {
        let (renderer, bus) = renderer();
        let mut rx = bus.subscribe();

        let panel = renderer.handle_tab_changed(&tab("bogus")).await;

        assert!(matches!(panel.state, PanelState::Failed(_)));
        assert!(panel.html().contains("retry-btn"));
        assert!(matches!(
            rx.recv().await.unwrap(),
            GuideEvent::ContentFailed { .. }
        ));
    }

    #[tokio::test]
    async fn listener_reacts_to_tab_changes() {
        let (renderer, bus) = renderer();
        let mut rx = bus.subscribe();
        let listener = renderer.listen();

        bus.publish(GuideEvent::TabChanged {
            tab: tab("solucoes"),
            previous: None,
        });

        loop {
            if let GuideEvent::ContentLoaded { tab: loaded, .. } = rx.recv().await.unwrap() {
                assert_eq!(loaded, tab("solucoes"));
                break;
            }
        }
        assert!(matches!(
            renderer.panel(&tab("solucoes")).unwrap().state,
            PanelState::Ready(_)
        ));
        listener.abort();
    }
}
