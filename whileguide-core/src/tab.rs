//! Tab identifiers

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GuideError;

/// Theory panel, shown first
pub const TEORIA: &str = "teoria";
/// Exercises panel
pub const EXERCICIOS: &str = "exercicios";
/// Solutions panel
pub const SOLUCOES: &str = "solucoes";

/// The three panels of the guide, in display order
pub const DEFAULT_TABS: [&str; 3] = [TEORIA, EXERCICIOS, SOLUCOES];

/// Opaque, non-empty key naming a content panel.
///
/// Unknown identifiers are perfectly valid values; whether a tab exists is a
/// question for the navigation or the content source, not for this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TabId(String);

impl TabId {
    pub fn new(id: impl Into<String>) -> Result<Self, GuideError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(GuideError::EmptyTabId);
        }
        if trimmed.len() == id.len() {
            Ok(Self(id))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The tab the guide opens on
    pub fn initial() -> Self {
        Self(TEORIA.to_string())
    }

    /// Identifiers for [`DEFAULT_TABS`]
    pub fn defaults() -> Vec<Self> {
        DEFAULT_TABS.iter().map(|t| Self(t.to_string())).collect()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TabId {
    type Err = GuideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TabId {
    type Error = GuideError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for TabId {
    type Error = GuideError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TabId> for String {
    fn from(tab: TabId) -> Self {
        tab.0
    }
}

impl AsRef<str> for TabId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TabId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
