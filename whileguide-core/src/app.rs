//! Application bootstrap: analytics, progress persistence, notifications
//!
//! The app does not own the other components. It listens to the event bus,
//! keeps counters, remembers the last tab it saw, and persists a progress
//! record that a later session can restore.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{GuideError, Result};
use crate::events::{EventBus, GuideEvent};
use crate::storage::{self, Storage, DEBUG_KEY, PROGRESS_KEY};
use crate::tab::TabId;

/// Notifications disappear after this long
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

/// Saved progress older than this is ignored by default
pub const DEFAULT_PROGRESS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub page_views: u64,
    pub tab_changes: u64,
    pub codes_copied: u64,
}

/// What gets persisted between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub current_tab: Option<TabId>,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub analytics: Analytics,
    pub version: String,
}

impl Progress {
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
    created_at: Instant,
}

/// Contents of an exported user-data file
#[derive(Debug, Serialize, Deserialize)]
pub struct UserDataExport {
    pub version: String,
    pub timestamp: i64,
    pub progress: serde_json::Value,
    pub analytics: Analytics,
}

pub struct WhileGuideApp {
    version: String,
    analytics: Analytics,
    debug: bool,
    current_tab: Option<TabId>,
    progress_ttl: Duration,
    notifications: Vec<Notification>,
    storage: Arc<dyn Storage>,
    bus: EventBus,
}

impl WhileGuideApp {
    pub fn new(storage: Arc<dyn Storage>, bus: EventBus) -> Self {
        let debug = matches!(storage.get(DEBUG_KEY), Ok(Some(ref v)) if v == "true");

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            analytics: Analytics::default(),
            debug,
            current_tab: None,
            progress_ttl: DEFAULT_PROGRESS_TTL,
            notifications: Vec::new(),
            storage,
            bus,
        }
    }

    pub fn with_progress_ttl(mut self, ttl: Duration) -> Self {
        self.progress_ttl = ttl;
        self
    }

    /// Debug logging for this session only; not persisted
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug |= debug;
        self
    }

    /// Count the page view, restore saved progress and announce readiness.
    /// Returns the tab the caller should navigate to, if progress was restored.
    pub fn start(&mut self) -> Option<TabId> {
        self.log("Inicializando aplicação...");
        self.analytics.page_views += 1;

        let restored = self.restore_user_progress(Utc::now());
        self.bus.publish(GuideEvent::AppReady {
            version: self.version.clone(),
        });
        self.log("Aplicação pronta!");
        restored
    }

    /// Update counters and state for one event
    pub fn handle_event(&mut self, event: &GuideEvent) {
        match event {
            GuideEvent::TabChanged { tab, .. } => {
                self.analytics.tab_changes += 1;
                self.current_tab = Some(tab.clone());
                self.track_event("tab_change", serde_json::json!({ "tab": tab }));
            }
            GuideEvent::CodeCopied { method } => {
                self.analytics.codes_copied += 1;
                self.track_event("code_copy", serde_json::json!({ "method": method }));
            }
            GuideEvent::VisibilityChanged { hidden } => {
                if *hidden {
                    self.log("Página ficou oculta");
                    if let Err(e) = self.save_user_progress() {
                        warn!("Erro ao salvar progresso: {}", e);
                    }
                } else {
                    self.log("Página ficou visível");
                }
            }
            GuideEvent::ConnectionChanged { online } => self.on_connection_change(*online),
            GuideEvent::ContentFailed { tab, error } => {
                self.track_event("content_error", serde_json::json!({ "tab": tab, "error": error }));
            }
            GuideEvent::ContentLoaded { .. } | GuideEvent::AppReady { .. } => {}
        }
    }

    /// Handle every event already waiting on `rx`; returns how many
    pub fn drain(&mut self, rx: &mut broadcast::Receiver<GuideEvent>) -> usize {
        let mut handled = 0;
        loop {
            match rx.try_recv() {
                Ok(event) => {
                    self.handle_event(&event);
                    handled += 1;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("Analytics lagged, skipped {} events", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        handled
    }

    fn on_connection_change(&mut self, online: bool) {
        self.log(&format!("Conexão: {}", if online { "online" } else { "offline" }));
        if !online {
            self.notify(
                "Você está offline. Algumas funcionalidades podem não funcionar.",
                NotificationLevel::Warning,
            );
        }
    }

    pub fn track_event(&self, name: &str, data: serde_json::Value) {
        if self.debug {
            info!(event_name = name, %data, "Evento");
        } else {
            debug!(event_name = name, %data, "Evento");
        }
    }

    pub fn save_user_progress(&self) -> Result<()> {
        let progress = Progress {
            current_tab: self.current_tab.clone(),
            timestamp: Utc::now().timestamp_millis(),
            analytics: self.analytics,
            version: self.version.clone(),
        };
        storage::save_json(self.storage.as_ref(), PROGRESS_KEY, &progress)?;
        self.log("Progresso salvo");
        Ok(())
    }

    /// Saved tab, if the record is younger than the progress TTL at `now`
    pub fn restore_user_progress(&mut self, now: DateTime<Utc>) -> Option<TabId> {
        let progress: Option<Progress> = storage::load_json(self.storage.as_ref(), PROGRESS_KEY, None);
        let progress = progress?;
        self.log("Progresso restaurado");

        let age = now.timestamp_millis().saturating_sub(progress.timestamp);
        if age < 0 || age as u128 >= self.progress_ttl.as_millis() {
            debug!(age_ms = age, "saved progress too old, not restoring tab");
            return None;
        }

        let tab = progress.current_tab?;
        self.current_tab = Some(tab.clone());
        Some(tab)
    }

    pub fn notify(&mut self, message: impl Into<String>, level: NotificationLevel) {
        let message = message.into();
        match level {
            NotificationLevel::Info => info!("{}", message),
            NotificationLevel::Warning => warn!("{}", message),
            NotificationLevel::Error => tracing::error!("{}", message),
        }
        self.notifications.push(Notification {
            message,
            level,
            created_at: Instant::now(),
        });
    }

    /// Notifications younger than [`NOTIFICATION_TTL`]
    pub fn notifications(&mut self) -> &[Notification] {
        self.notifications
            .retain(|n| n.created_at.elapsed() < NOTIFICATION_TTL);
        &self.notifications
    }

    pub fn analytics(&self) -> Analytics {
        self.analytics
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn current_tab(&self) -> Option<&TabId> {
        self.current_tab.as_ref()
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn enable_debug(&mut self) -> Result<()> {
        self.debug = true;
        self.storage.set(DEBUG_KEY, "true")?;
        info!("Debug mode enabled");
        Ok(())
    }

    pub fn disable_debug(&mut self) -> Result<()> {
        self.debug = false;
        self.storage.remove(DEBUG_KEY)?;
        info!("Debug mode disabled");
        Ok(())
    }

    /// Write `while-guide-data-YYYY-MM-DD.json` into `dir`
    pub fn export_user_data(&self, dir: &Path) -> Result<PathBuf> {
        let now = Utc::now();
        let data = UserDataExport {
            version: self.version.clone(),
            timestamp: now.timestamp_millis(),
            progress: storage::load_json(
                self.storage.as_ref(),
                PROGRESS_KEY,
                serde_json::json!({}),
            ),
            analytics: self.analytics,
        };

        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("while-guide-data-{}.json", now.format("%Y-%m-%d")));
        let json = serde_json::to_string_pretty(&data)
            .map_err(|e| GuideError::json("user data export", e))?;
        std::fs::write(&path, json)?;

        info!("Exported user data to {}", path.display());
        Ok(path)
    }

    fn log(&self, message: &str) {
        if self.debug {
            info!("[WhileGuide] {}", message);
        } else {
            debug!("[WhileGuide] {}", message);
        }
    }
}

impl std::fmt::Debug for WhileGuideApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhileGuideApp")
            .field("version", &self.version)
            .field("analytics", &self.analytics)
            .field("debug", &self.debug)
            .field("current_tab", &self.current_tab)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CopyMethod;
    use crate::storage::MemoryStorage;
    use tempfile::TempDir;

    fn tab(id: &str) -> TabId {
        TabId::new(id).unwrap()
    }

    fn app() -> (WhileGuideApp, Arc<MemoryStorage>, EventBus) {
        let storage = Arc::new(MemoryStorage::new());
        let bus = EventBus::new();
        let app = WhileGuideApp::new(storage.clone(), bus.clone());
        (app, storage, bus)
    }

    #[test]
    fn counts_tab_changes_and_copies() {
        let (mut app, _, bus) = app();
        let mut rx = bus.subscribe();

        bus.publish(GuideEvent::TabChanged {
            tab: tab("exercicios"),
            previous: Some(tab("teoria")),
        });
        bus.publish(GuideEvent::CodeCopied {
            method: CopyMethod::Fallback,
        });
        bus.publish(GuideEvent::CodeCopied {
            method: CopyMethod::ClipboardApi,
        });

        assert_eq!(app.drain(&mut rx), 3);
        assert_eq!(
            app.analytics(),
            Analytics {
                page_views: 0,
                tab_changes: 1,
                codes_copied: 2
            }
        );
        assert_eq!(app.current_tab(), Some(&tab("exercicios")));
    }

    #[test]
    fn start_counts_page_view_and_announces() {
        let (mut app, _, bus) = app();
        let mut rx = bus.subscribe();

        assert_eq!(app.start(), None);

        assert_eq!(app.analytics().page_views, 1);
        assert!(matches!(rx.try_recv().unwrap(), GuideEvent::AppReady { .. }));
    }

    #[test]
    fn progress_restores_within_ttl() {
        let (mut app, storage, _) = app();
        app.handle_event(&GuideEvent::TabChanged {
            tab: tab("solucoes"),
            previous: None,
        });
        app.save_user_progress().unwrap();

        let mut next = WhileGuideApp::new(storage.clone(), EventBus::new());
        assert_eq!(next.restore_user_progress(Utc::now()), Some(tab("solucoes")));

        let later = Utc::now() + chrono::Duration::hours(25);
        let mut stale = WhileGuideApp::new(storage, EventBus::new());
        assert_eq!(stale.restore_user_progress(later), None);
    }

    #[test]
    fn hidden_page_saves_progress() {
        let (mut app, storage, _) = app();
        app.handle_event(&GuideEvent::TabChanged {
            tab: tab("exercicios"),
            previous: None,
        });

        app.handle_event(&GuideEvent::VisibilityChanged { hidden: true });

        let saved: Option<Progress> = storage::load_json(storage.as_ref(), PROGRESS_KEY, None);
        let saved = saved.unwrap();
        assert_eq!(saved.current_tab, Some(tab("exercicios")));
        assert_eq!(saved.analytics.tab_changes, 1);
        assert!(saved.saved_at().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn offline_notification_expires() {
        let (mut app, _, _) = app();

        app.handle_event(&GuideEvent::ConnectionChanged { online: false });
        assert_eq!(app.notifications().len(), 1);
        assert_eq!(app.notifications()[0].level, NotificationLevel::Warning);

        tokio::time::sleep(NOTIFICATION_TTL + Duration::from_millis(1)).await;
        assert!(app.notifications().is_empty());
    }

    #[test]
    fn debug_flag_is_persisted() {
        let (mut app, storage, _) = app();

        app.enable_debug().unwrap();
        assert!(WhileGuideApp::new(storage.clone(), EventBus::new()).is_debug());

        app.disable_debug().unwrap();
        assert!(!WhileGuideApp::new(storage, EventBus::new()).is_debug());
    }

    #[test]
    fn export_writes_dated_json() {
        let (mut app, _, _) = app();
        let temp = TempDir::new().unwrap();
        app.start();
        app.save_user_progress().unwrap();

        let path = app.export_user_data(temp.path()).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("while-guide-data-"));
        let data: UserDataExport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(data.analytics.page_views, 1);
        assert_eq!(data.progress["version"], app.version());
    }
}
