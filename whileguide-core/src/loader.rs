//! Per-tab content loader with caching and request coalescing
//!
//! ```text
//! request_content(tab)
//!   ├─ cached?     → ready handle, no lookup
//!   ├─ in flight?  → the same pending handle
//!   └─ otherwise   → spawn lookup, register handle
//!                      ├─ Ok  → cache it, drop in-flight entry
//!                      └─ Err → drop in-flight entry only
//! ```
//!
//! Rendering is not the loader's business: callers await the handle and put
//! the HTML wherever they like (see [`crate::render`]).

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, error, info, warn};

use crate::error::ContentError;
use crate::source::ContentSource;
use crate::tab::TabId;

/// Outcome of a content resolution
pub type ContentResult = Result<Arc<str>, ContentError>;

/// Cloneable handle to a (possibly still pending) content resolution.
///
/// Every clone resolves to the same result. Two handles obtained for the same
/// tab while a resolution was in flight are the same handle (see
/// [`ContentHandle::ptr_eq`]).
#[derive(Clone)]
pub struct ContentHandle {
    inner: Shared<BoxFuture<'static, ContentResult>>,
}

impl ContentHandle {
    fn ready(result: ContentResult) -> Self {
        Self {
            inner: futures::future::ready(result).boxed().shared(),
        }
    }

    /// True if both handles share one underlying resolution
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.inner.ptr_eq(&other.inner)
    }

    /// Result, if the resolution already finished
    pub fn peek(&self) -> Option<&ContentResult> {
        self.inner.peek()
    }
}

impl Future for ContentHandle {
    type Output = ContentResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

impl std::fmt::Debug for ContentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentHandle")
            .field("ready", &self.peek().is_some())
            .finish()
    }
}

#[derive(Default)]
struct LoaderState {
    cache: HashMap<TabId, Arc<str>>,
    in_flight: HashMap<TabId, ContentHandle>,
}

struct Inner {
    source: Arc<dyn ContentSource>,
    state: Mutex<LoaderState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, LoaderState> {
        // The state is plain bookkeeping; a panic elsewhere cannot leave it
        // half-updated, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Resolves tab content exactly once per cache lifetime
#[derive(Clone)]
pub struct ContentLoader {
    inner: Arc<Inner>,
}

impl ContentLoader {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                state: Mutex::new(LoaderState::default()),
            }),
        }
    }

    pub fn with_source(source: impl ContentSource + 'static) -> Self {
        Self::new(Arc::new(source))
    }

    /// Request the content for `tab`.
    ///
    /// Returns immediately. When called inside a tokio runtime the lookup is
    /// spawned so it runs to completion even if every handle is dropped;
    /// outside a runtime it is driven by whoever awaits the handle. A lookup
    /// that panics (a source that needs a missing runtime, say) resolves to
    /// `ContentNotFound` and clears its in-flight entry like any failure.
    pub fn request_content(&self, tab: &TabId) -> ContentHandle {
        let mut state = self.inner.lock();

        if let Some(content) = state.cache.get(tab) {
            debug!(tab = %tab, "content cache hit");
            return ContentHandle::ready(Ok(Arc::clone(content)));
        }

        if let Some(pending) = state.in_flight.get(tab) {
            debug!(tab = %tab, "joining in-flight content request");
            return pending.clone();
        }

        debug!(tab = %tab, "starting content resolution");
        let handle = ContentHandle {
            inner: Self::resolve(Arc::clone(&self.inner), tab.clone())
                .boxed()
                .shared(),
        };
        state.in_flight.insert(tab.clone(), handle.clone());
        drop(state);

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(handle.clone());
        }

        handle
    }

    async fn resolve(inner: Arc<Inner>, tab: TabId) -> ContentResult {
        // A panicking lookup resolves like any other miss.
        let result = match AssertUnwindSafe(inner.source.lookup(&tab))
            .catch_unwind()
            .await
        {
            Ok(found) => found.map(Arc::<str>::from),
            Err(_) => {
                error!(tab = %tab, "content source panicked during lookup");
                Err(ContentError::not_found(tab.as_str()))
            }
        };

        {
            let mut state = inner.lock();
            state.in_flight.remove(&tab);
            match &result {
                Ok(content) => {
                    info!(tab = %tab, bytes = content.len(), "content loaded");
                    state.cache.insert(tab.clone(), Arc::clone(content));
                }
                Err(e) => warn!(tab = %tab, "content resolution failed: {}", e),
            }
        }

        result
    }

    /// Drop the cached content for `tab`. An in-flight resolution is left alone.
    pub fn invalidate(&self, tab: &TabId) {
        if self.inner.lock().cache.remove(tab).is_some() {
            debug!(tab = %tab, "content cache entry invalidated");
        }
    }

    /// Drop every cached entry
    pub fn invalidate_all(&self) {
        let mut state = self.inner.lock();
        let cleared = state.cache.len();
        state.cache.clear();
        debug!(cleared, "content cache cleared");
    }

    /// Invalidate, then request again
    pub fn reload(&self, tab: &TabId) -> ContentHandle {
        self.invalidate(tab);
        self.request_content(tab)
    }

    /// Load a tab ahead of time (the guide preloads its initial tab)
    pub async fn preload(&self, tab: &TabId) -> ContentResult {
        self.request_content(tab).await
    }

    pub fn is_cached(&self, tab: &TabId) -> bool {
        self.inner.lock().cache.contains_key(tab)
    }

    pub fn is_loading(&self, tab: &TabId) -> bool {
        self.inner.lock().in_flight.contains_key(tab)
    }

    /// Cached tab identifiers, sorted
    pub fn cached_tabs(&self) -> Vec<TabId> {
        let mut tabs: Vec<TabId> = self.inner.lock().cache.keys().cloned().collect();
        tabs.sort();
        tabs
    }
}

impl std::fmt::Debug for ContentLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("ContentLoader")
            .field("cached", &state.cache.len())
            .field("in_flight", &state.in_flight.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BuiltinSource;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn tab(id: &str) -> TabId {
        TabId::new(id).unwrap()
    }

    #[tokio::test]
    async fn cache_hit_returns_ready_handle() {
        let loader = ContentLoader::with_source(BuiltinSource::instant());
        let first = loader.request_content(&tab("teoria")).await.unwrap();

        let handle = loader.request_content(&tab("teoria"));
        assert!(handle.peek().is_some());
        assert_eq!(handle.await.unwrap(), first);
    }

    #[tokio::test]
    async fn failure_clears_in_flight_entry() {
        let loader = ContentLoader::with_source(BuiltinSource::instant());

        let err = loader.request_content(&tab("bogus")).await.unwrap_err();

        assert_eq!(err, ContentError::not_found("bogus"));
        assert!(!loader.is_loading(&tab("bogus")));
        assert!(!loader.is_cached(&tab("bogus")));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_handle_still_completes() {
        let loader = ContentLoader::with_source(BuiltinSource::default());

        drop(loader.request_content(&tab("exercicios")));
        assert!(loader.is_loading(&tab("exercicios")));

        tokio::time::sleep(crate::source::DEFAULT_FETCH_DELAY * 2).await;

        assert!(loader.is_cached(&tab("exercicios")));
        assert!(!loader.is_loading(&tab("exercicios")));
    }

    #[test]
    fn works_without_runtime_when_awaited() {
        let loader = ContentLoader::with_source(BuiltinSource::instant());
        let content = futures::executor::block_on(loader.request_content(&tab("solucoes")));

        assert!(content.is_ok());
        assert_eq!(loader.cached_tabs(), vec![tab("solucoes")]);
    }

    #[test]
    fn delayed_source_works_without_runtime() {
        let loader = ContentLoader::with_source(BuiltinSource::new(Duration::from_millis(10)));

        let content = futures::executor::block_on(loader.request_content(&tab("teoria")));

        assert!(content.is_ok());
        assert!(loader.is_cached(&tab("teoria")));
        assert!(!loader.is_loading(&tab("teoria")));
    }

    struct PanicsOnce {
        panicked: AtomicBool,
    }

    #[async_trait::async_trait]
    impl ContentSource for PanicsOnce {
        async fn lookup(&self, tab: &TabId) -> Result<String, ContentError> {
            if !self.panicked.swap(true, Ordering::SeqCst) {
                panic!("source blew up");
            }
            Ok(format!("<p>{}</p>", tab))
        }
    }

    #[test]
    fn panicking_lookup_does_not_wedge_the_tab() {
        let loader = ContentLoader::with_source(PanicsOnce {
            panicked: AtomicBool::new(false),
        });

        let first = futures::executor::block_on(loader.request_content(&tab("teoria")));
        assert_eq!(first.unwrap_err(), ContentError::not_found("teoria"));
        assert!(!loader.is_loading(&tab("teoria")));

        let second = futures::executor::block_on(loader.request_content(&tab("teoria")));
        assert_eq!(&*second.unwrap(), "<p>teoria</p>");
        assert!(loader.is_cached(&tab("teoria")));
    }

    #[tokio::test]
    async fn invalidate_all_empties_cache() {
        let loader = ContentLoader::with_source(BuiltinSource::instant());
        loader.preload(&tab("teoria")).await.unwrap();
        loader.preload(&tab("solucoes")).await.unwrap();

        loader.invalidate_all();

        assert!(loader.cached_tabs().is_empty());
    }
}
