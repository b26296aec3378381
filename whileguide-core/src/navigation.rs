//! Tab navigation - which panel is visible
//!
//! Headless version of the tab strip: an ordered list of panels, the current
//! selection, keyboard-style movement with wraparound, persistence of the
//! current tab, and a `TabChanged` notification on every switch.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::events::{EventBus, GuideEvent};
use crate::storage::{Storage, CURRENT_TAB_KEY};
use crate::tab::TabId;

/// Keys that move the selection along the tab strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Left,
    Right,
    Home,
    End,
}

impl NavKey {
    /// Parse a key name (`ArrowLeft`, `left`, `home`, ...); `None` for keys
    /// the tab strip ignores.
    pub fn parse(key: &str) -> Option<Self> {
        match key.to_ascii_lowercase().as_str() {
            "arrowleft" | "left" | "h" => Some(Self::Left),
            "arrowright" | "right" | "l" => Some(Self::Right),
            "home" => Some(Self::Home),
            "end" => Some(Self::End),
            _ => None,
        }
    }
}

pub struct TabNavigation {
    panels: Vec<TabId>,
    current: TabId,
    storage: Arc<dyn Storage>,
    bus: EventBus,
}

impl TabNavigation {
    /// Build a tab strip over `panels` (display order). The initial tab is
    /// `teoria` when present, otherwise the first panel. Nothing is announced
    /// until [`TabNavigation::show_tab`] runs.
    pub fn new(panels: Vec<TabId>, storage: Arc<dyn Storage>, bus: EventBus) -> Self {
        let initial = TabId::initial();
        let current = if panels.contains(&initial) || panels.is_empty() {
            initial
        } else {
            panels[0].clone()
        };

        Self {
            panels,
            current,
            storage,
            bus,
        }
    }

    /// Tab strip over the guide's three default panels
    pub fn with_defaults(storage: Arc<dyn Storage>, bus: EventBus) -> Self {
        Self::new(TabId::defaults(), storage, bus)
    }

    pub fn tab_exists(&self, tab: &TabId) -> bool {
        self.panels.contains(tab)
    }

    /// Make `tab` the visible panel.
    ///
    /// Unknown tabs are logged and ignored (returns `false`). Otherwise the
    /// tab is persisted and `TabChanged` is published, even when it was
    /// already current.
    pub fn show_tab(&mut self, tab: &TabId) -> bool {
        if !self.tab_exists(tab) {
            warn!("Aba '{}' não encontrada", tab);
            return false;
        }

        let previous = std::mem::replace(&mut self.current, tab.clone());
        self.save_current_tab(tab);

        self.bus.publish(GuideEvent::TabChanged {
            tab: tab.clone(),
            previous: Some(previous),
        });
        debug!(tab = %tab, "tab shown");
        true
    }

    /// Programmatic navigation
    pub fn navigate_to(&mut self, tab: &TabId) -> bool {
        self.show_tab(tab)
    }

    /// Move the selection with a key. Returns the newly shown tab.
    pub fn handle_key(&mut self, key: NavKey) -> Option<TabId> {
        if self.panels.is_empty() {
            return None;
        }

        let last = self.panels.len() - 1;
        let index = self.panels.iter().position(|t| t == &self.current).unwrap_or(0);

        let next = match key {
            NavKey::Left => {
                if index > 0 {
                    index - 1
                } else {
                    last
                }
            }
            NavKey::Right => {
                if index < last {
                    index + 1
                } else {
                    0
                }
            }
            NavKey::Home => 0,
            NavKey::End => last,
        };

        let tab = self.panels[next].clone();
        self.show_tab(&tab).then_some(tab)
    }

    pub fn current_tab(&self) -> &TabId {
        &self.current
    }

    pub fn available_tabs(&self) -> &[TabId] {
        &self.panels
    }

    /// Saved tab if it still names a panel, otherwise the default
    pub fn load_saved_tab(&self) -> TabId {
        match self.storage.get(CURRENT_TAB_KEY) {
            Ok(Some(saved)) => {
                if let Ok(tab) = TabId::new(saved) {
                    if self.tab_exists(&tab) {
                        return tab;
                    }
                }
            }
            Ok(None) => {}
            Err(e) => debug!("Storage unavailable, ignoring saved tab: {}", e),
        }
        TabId::initial()
    }

    fn save_current_tab(&self, tab: &TabId) {
        if let Err(e) = self.storage.set(CURRENT_TAB_KEY, tab.as_str()) {
            debug!("Storage unavailable, current tab not saved: {}", e);
        }
    }
}

impl std::fmt::Debug for TabNavigation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabNavigation")
            .field("panels", &self.panels)
            .field("current", &self.current)
            .finish()
    }
}
