//! Structured error types for the whileguide-core library.
//!
//! The content loader has exactly one failure mode, [`ContentError`], which is
//! `Clone` so that every holder of a shared [`crate::ContentHandle`] can observe
//! it. Everything else the library can fail at is a [`GuideError`]. The binary
//! crate wraps both in `anyhow`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure while resolving tab content
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    /// No content source knows this tab identifier
    #[error("Conteúdo não encontrado para: {tab}")]
    ContentNotFound { tab: String },
}

impl ContentError {
    /// Create a not-found error for a tab
    pub fn not_found(tab: impl Into<String>) -> Self {
        Self::ContentNotFound { tab: tab.into() }
    }
}

/// Main error type for whileguide-core operations
#[derive(Error, Debug)]
pub enum GuideError {
    /// Tab identifiers must carry at least one visible character
    #[error("Tab identifier must not be empty")]
    EmptyTabId,

    /// Tab is not one of the known panels
    #[error("Tab '{tab}' not found")]
    UnknownTab { tab: String },

    /// Content resolution failed
    #[error(transparent)]
    Content(#[from] ContentError),

    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// JSON parsing or serialization failed
    #[error("JSON error at {context}: {source}")]
    Json {
        context: String,
        source: serde_json::Error,
    },

    /// Key/value storage could not be read or written
    #[error("Storage error at {path:?}: {reason}")]
    Storage { path: PathBuf, reason: String },

    /// Neither clipboard backend accepted the text
    #[error("Clipboard unavailable: {reason}")]
    Clipboard { reason: String },

    /// Requested code block does not exist in the panel
    #[error("Code block {index} not found ({available} available)")]
    CodeBlockNotFound { index: usize, available: usize },

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Config { reason: String },
}

/// Result type alias for whileguide-core operations
pub type Result<T> = std::result::Result<T, GuideError>;

impl GuideError {
    /// Create a JSON error with context
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    /// Create an unknown tab error
    pub fn unknown_tab(tab: impl Into<String>) -> Self {
        Self::UnknownTab { tab: tab.into() }
    }

    /// Create a storage error
    pub fn storage(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a clipboard error
    pub fn clipboard(reason: impl Into<String>) -> Self {
        Self::Clipboard {
            reason: reason.into(),
        }
    }

    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}
