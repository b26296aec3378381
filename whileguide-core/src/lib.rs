pub mod app;
pub mod config;
pub mod copy;
pub mod error;
pub mod events;
pub mod loader;
pub mod navigation;
pub mod render;
pub mod source;
pub mod storage;
pub mod tab;
pub mod utils;

pub use app::{Analytics, Notification, NotificationLevel, Progress, WhileGuideApp};
pub use config::GuideConfig;
pub use copy::{find_code_blocks, ClipboardBackend, CodeBlock, CodeCopyManager};
pub use error::{ContentError, GuideError, Result};
pub use events::{CopyMethod, EventBus, GuideEvent};
pub use loader::{ContentHandle, ContentLoader, ContentResult};
pub use navigation::{NavKey, TabNavigation};
pub use render::{Panel, PanelRenderer, PanelState};
pub use source::{BuiltinSource, ContentSource, DirSource};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use tab::TabId;
