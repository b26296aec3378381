//! Guide-wide notifications
//!
//! Components never call each other directly for cross-cutting reactions;
//! they publish a [`GuideEvent`] on the [`EventBus`] and whoever cares
//! subscribes. Publishing with nobody listening is fine.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::tab::TabId;

const DEFAULT_CAPACITY: usize = 64;

/// How a code sample reached the clipboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CopyMethod {
    /// System clipboard
    ClipboardApi,
    /// Terminal escape sequence fallback
    Fallback,
}

impl CopyMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClipboardApi => "clipboard-api",
            Self::Fallback => "fallback",
        }
    }
}

/// Everything the guide announces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum GuideEvent {
    /// The visible panel changed
    #[serde(rename_all = "camelCase")]
    TabChanged {
        tab: TabId,
        previous: Option<TabId>,
    },
    /// A panel received fresh content. `panel` names the container that was
    /// updated so highlighters and copy-button attachers can rescan it.
    ContentLoaded { tab: TabId, panel: String },
    /// Content resolution failed; the panel now shows a retry affordance
    ContentFailed { tab: TabId, error: String },
    /// A code sample was copied
    CodeCopied { method: CopyMethod },
    /// Bootstrap finished
    AppReady { version: String },
    /// The session was hidden or shown again
    VisibilityChanged { hidden: bool },
    /// Connectivity changed
    ConnectionChanged { online: bool },
}

impl GuideEvent {
    /// Short name, used for analytics and logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::TabChanged { .. } => "tabChanged",
            Self::ContentLoaded { .. } => "contentLoaded",
            Self::ContentFailed { .. } => "contentFailed",
            Self::CodeCopied { .. } => "codeCopied",
            Self::AppReady { .. } => "appReady",
            Self::VisibilityChanged { .. } => "visibilityChanged",
            Self::ConnectionChanged { .. } => "connectionChanged",
        }
    }
}

/// Broadcast channel shared by all components
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GuideEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event; returns how many subscribers saw it
    pub fn publish(&self, event: GuideEvent) -> usize {
        trace!(event = event.name(), "publish");
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GuideEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_is_harmless() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(GuideEvent::VisibilityChanged { hidden: true }), 0);
    }

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(GuideEvent::ConnectionChanged { online: false });
        bus.publish(GuideEvent::ConnectionChanged { online: true });

        assert_eq!(
            rx.recv().await.unwrap(),
            GuideEvent::ConnectionChanged { online: false }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            GuideEvent::ConnectionChanged { online: true }
        );
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = GuideEvent::TabChanged {
            tab: TabId::new("exercicios").unwrap(),
            previous: Some(TabId::initial()),
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "tabChanged");
        assert_eq!(json["tab"], "exercicios");
        assert_eq!(json["previous"], "teoria");

        let copied = serde_json::to_value(GuideEvent::CodeCopied {
            method: CopyMethod::ClipboardApi,
        })
        .unwrap();
        assert_eq!(copied["method"], "clipboard-api");
    }
}
