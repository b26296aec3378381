use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::error::{GuideError, Result};
use crate::tab::TabId;

/// Template written by `whileguide config init`
pub const CONFIG_TEMPLATE: &str = r#"# whileguide configuration

[content]
# Simulated latency for the built-in documents, in milliseconds
fetch_delay_ms = 500
# Read <tab>.html from this directory instead of the built-in documents
# dir = "${HOME}/whileguide-content"
default_tab = "teoria"

[storage]
dir = "${HOME}/.whileguide"
# Saved progress older than this is not restored
progress_ttl_hours = 24

[ui]
button_text = "Copiar"
debug = false
"#;

/// Centralized configuration for whileguide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideConfig {
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub fetch_delay_ms: u64,
    pub dir: Option<PathBuf>,
    pub default_tab: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub dir: PathBuf,
    pub progress_ttl_hours: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub button_text: String,
    pub debug: bool,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            fetch_delay_ms: 500,
            dir: None,
            default_tab: crate::tab::TEORIA.to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: GuideConfig::home_dir(),
            progress_ttl_hours: 24,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            button_text: crate::copy::DEFAULT_BUTTON_TEXT.to_string(),
            debug: false,
        }
    }
}

impl Default for GuideConfig {
    fn default() -> Self {
        Self {
            content: ContentConfig::default(),
            storage: StorageConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl GuideConfig {
    /// Load config from `WHILEGUIDE_CONFIG` or ~/.whileguide/config.toml.
    ///
    /// A missing file is not an error: the guide runs on defaults. Environment
    /// overrides apply either way.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            debug!("No config at {:?}, using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();
        config.expand_variables();
        Ok(config)
    }

    /// Parse a config file without environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| GuideError::config(format!("Failed to read {:?}: {}", path, e)))?;

        let mut config: Self = toml::from_str(&content)
            .map_err(|e| GuideError::config(format!("Invalid TOML in {:?}: {}", path, e)))?;
        config.expand_variables();
        Ok(config)
    }

    /// ~/.whileguide
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".whileguide")
    }

    /// Get config file path: `WHILEGUIDE_CONFIG` or ~/.whileguide/config.toml
    pub fn config_path() -> PathBuf {
        env::var("WHILEGUIDE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::home_dir().join("config.toml"))
    }

    pub fn fetch_delay(&self) -> Duration {
        Duration::from_millis(self.content.fetch_delay_ms)
    }

    pub fn progress_ttl(&self) -> Duration {
        Duration::from_secs(self.storage.progress_ttl_hours * 60 * 60)
    }

    pub fn default_tab(&self) -> Result<TabId> {
        TabId::new(self.content.default_tab.clone())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(delay) = env::var("WHILEGUIDE_FETCH_DELAY_MS") {
            match delay.parse() {
                Ok(ms) => self.content.fetch_delay_ms = ms,
                Err(_) => debug!("Ignoring WHILEGUIDE_FETCH_DELAY_MS={:?}", delay),
            }
        }
        if let Ok(dir) = env::var("WHILEGUIDE_CONTENT_DIR") {
            self.content.dir = Some(PathBuf::from(dir));
        }
        if let Ok(dir) = env::var("WHILEGUIDE_STORAGE_DIR") {
            self.storage.dir = PathBuf::from(dir);
        }
        if let Ok(flag) = env::var("WHILEGUIDE_DEBUG") {
            self.ui.debug = matches!(flag.as_str(), "1" | "true");
        }
    }

    /// Expand ${var} references in paths
    fn expand_variables(&mut self) {
        let mut vars = HashMap::new();
        vars.insert("HOME".to_string(), env::var("HOME").unwrap_or_default());

        self.storage.dir = Self::expand_path(&self.storage.dir, &vars);
        if let Some(ref dir) = self.content.dir {
            self.content.dir = Some(Self::expand_path(dir, &vars));
        }
    }

    fn expand_path(path: &Path, vars: &HashMap<String, String>) -> PathBuf {
        PathBuf::from(Self::expand_string(&path.display().to_string(), vars))
    }

    /// Expand ${var} references in a string
    fn expand_string(s: &str, vars: &HashMap<String, String>) -> String {
        let mut result = s.to_string();

        for (key, value) in vars {
            let pattern = format!("${{{}}}", key);
            result = result.replace(&pattern, value);
        }

        result
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| GuideError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_str)?;
        Ok(())
    }
}
