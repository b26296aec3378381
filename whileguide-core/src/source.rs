//! Content sources - where tab HTML comes from
//!
//! A [`ContentSource`] maps a tab identifier to an HTML document or reports
//! [`ContentError::ContentNotFound`]. The loader treats every lookup as an
//! opaque suspension point, so an in-memory table, a directory on disk or a
//! network call all satisfy the same contract.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::ContentError;
use crate::tab::{TabId, EXERCICIOS, SOLUCOES, TEORIA};

/// Default simulated fetch latency for [`BuiltinSource`]
pub const DEFAULT_FETCH_DELAY: Duration = Duration::from_millis(500);

const TEORIA_HTML: &str = include_str!("../content/teoria.html");
const EXERCICIOS_HTML: &str = include_str!("../content/exercicios.html");
const SOLUCOES_HTML: &str = include_str!("../content/solucoes.html");

/// Resolves tab identifiers to HTML content
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Look up the document for `tab`
    async fn lookup(&self, tab: &TabId) -> Result<String, ContentError>;
}

/// The three canned documents shipped with the guide
#[derive(Debug, Clone)]
pub struct BuiltinSource {
    delay: Duration,
}

impl BuiltinSource {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// A source that answers without simulated latency
    pub fn instant() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Synchronous table lookup, without the simulated delay
    pub fn document(tab: &str) -> Option<&'static str> {
        match tab {
            TEORIA => Some(TEORIA_HTML),
            EXERCICIOS => Some(EXERCICIOS_HTML),
            SOLUCOES => Some(SOLUCOES_HTML),
            _ => None,
        }
    }
}

impl Default for BuiltinSource {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_DELAY)
    }
}

#[async_trait]
impl ContentSource for BuiltinSource {
    async fn lookup(&self, tab: &TabId) -> Result<String, ContentError> {
        if !self.delay.is_zero() {
            if tokio::runtime::Handle::try_current().is_ok() {
                tokio::time::sleep(self.delay).await;
            } else {
                // No tokio timer outside a runtime.
                std::thread::sleep(self.delay);
            }
        }

        debug!(tab = %tab, "builtin content lookup");
        Self::document(tab.as_str())
            .map(str::to_string)
            .ok_or_else(|| ContentError::not_found(tab.as_str()))
    }
}

/// Reads `<root>/<tab>.html` from disk
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the document for a tab
    pub fn path_for(&self, tab: &TabId) -> PathBuf {
        self.root.join(format!("{}.html", tab))
    }
}

#[async_trait]
impl ContentSource for DirSource {
    async fn lookup(&self, tab: &TabId) -> Result<String, ContentError> {
        // Identifiers are opaque; refuse anything that could escape the root.
        if tab.as_str().contains(['/', '\\']) || tab.as_str().starts_with('.') {
            return Err(ContentError::not_found(tab.as_str()));
        }

        let path = self.path_for(tab);
        match fs::read_to_string(&path).await {
            Ok(content) => {
                debug!(tab = %tab, path = %path.display(), "read content from disk");
                Ok(content)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ContentError::not_found(tab.as_str()))
            }
            Err(e) => {
                warn!("Failed to read content {}: {}", path.display(), e);
                Err(ContentError::not_found(tab.as_str()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tab(id: &str) -> TabId {
        TabId::new(id).unwrap()
    }

    #[tokio::test]
    async fn builtin_knows_the_three_tabs() {
        let source = BuiltinSource::instant();

        for id in crate::tab::DEFAULT_TABS {
            let html = source.lookup(&tab(id)).await.unwrap();
            assert!(html.contains("class=\"section\""), "{} has no section", id);
        }
    }

    #[tokio::test]
    async fn builtin_rejects_unknown_tab() {
        let source = BuiltinSource::instant();
        let err = source.lookup(&tab("bogus")).await.unwrap_err();
        assert_eq!(err, ContentError::not_found("bogus"));
    }

    #[tokio::test(start_paused = true)]
    async fn builtin_waits_for_the_simulated_delay() {
        let source = BuiltinSource::default();
        let started = tokio::time::Instant::now();

        source.lookup(&tab(TEORIA)).await.unwrap();

        assert!(started.elapsed() >= DEFAULT_FETCH_DELAY);
    }

    #[tokio::test]
    async fn dir_source_reads_html_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("teoria.html"), "<p>oi</p>").unwrap();
        let source = DirSource::new(temp.path());

        assert_eq!(source.lookup(&tab("teoria")).await.unwrap(), "<p>oi</p>");
        assert_eq!(
            source.lookup(&tab("solucoes")).await.unwrap_err(),
            ContentError::not_found("solucoes")
        );
    }

    #[tokio::test]
    async fn dir_source_refuses_path_traversal() {
        let temp = TempDir::new().unwrap();
        let source = DirSource::new(temp.path());

        assert!(source.lookup(&tab("../secret")).await.is_err());
        assert!(source.lookup(&tab(".hidden")).await.is_err());
    }
}
