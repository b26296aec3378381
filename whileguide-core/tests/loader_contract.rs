//! Caching and coalescing behaviour of the content loader, observed through
//! a source that counts its lookups.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use whileguide_core::{ContentError, ContentLoader, ContentSource, TabId};

struct CountingSource {
    lookups: AtomicUsize,
    gate: Semaphore,
    knows_bogus: AtomicBool,
}

impl CountingSource {
    fn open() -> Arc<Self> {
        Arc::new(Self {
            lookups: AtomicUsize::new(0),
            gate: Semaphore::new(Semaphore::MAX_PERMITS),
            knows_bogus: AtomicBool::new(false),
        })
    }

    /// Every lookup blocks until `release` is called
    fn gated() -> Arc<Self> {
        Arc::new(Self {
            lookups: AtomicUsize::new(0),
            gate: Semaphore::new(0),
            knows_bogus: AtomicBool::new(false),
        })
    }

    fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentSource for CountingSource {
    async fn lookup(&self, tab: &TabId) -> Result<String, ContentError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| ContentError::not_found(tab.as_str()))?;
        permit.forget();

        match tab.as_str() {
            "teoria" | "exercicios" | "solucoes" => Ok(format!("<h2>{}</h2>", tab)),
            "bogus" if self.knows_bogus.load(Ordering::SeqCst) => Ok("<p>agora existe</p>".into()),
            _ => Err(ContentError::not_found(tab.as_str())),
        }
    }
}

fn tab(id: &str) -> TabId {
    TabId::new(id).unwrap()
}

#[tokio::test]
async fn cache_hit_is_idempotent() {
    let source = CountingSource::open();
    let loader = ContentLoader::new(source.clone());

    let first = loader.request_content(&tab("teoria")).await.unwrap();
    let second = loader.request_content(&tab("teoria")).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(source.lookups(), 1);
}

#[tokio::test]
async fn concurrent_requests_coalesce() {
    let source = CountingSource::gated();
    let loader = ContentLoader::new(source.clone());

    let a = loader.request_content(&tab("exercicios"));
    let b = loader.request_content(&tab("exercicios"));
    assert!(a.ptr_eq(&b));
    assert!(loader.is_loading(&tab("exercicios")));

    source.release(1);
    let (a, b) = tokio::join!(a, b);

    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(source.lookups(), 1);
    assert!(!loader.is_loading(&tab("exercicios")));
}

#[tokio::test]
async fn failure_does_not_poison_the_cache() {
    let source = CountingSource::open();
    let loader = ContentLoader::new(source.clone());

    let err = loader.request_content(&tab("bogus")).await.unwrap_err();
    assert_eq!(err, ContentError::ContentNotFound { tab: "bogus".into() });
    assert!(!loader.is_cached(&tab("bogus")));

    source.knows_bogus.store(true, Ordering::SeqCst);
    let content = loader.request_content(&tab("bogus")).await.unwrap();

    assert_eq!(&*content, "<p>agora existe</p>");
    assert_eq!(source.lookups(), 2);
}

#[tokio::test]
async fn invalidate_then_reload_looks_up_again() {
    let source = CountingSource::open();
    let loader = ContentLoader::new(source.clone());

    let before = loader.request_content(&tab("solucoes")).await.unwrap();
    loader.invalidate(&tab("solucoes"));
    assert!(!loader.is_cached(&tab("solucoes")));

    let after = loader.reload(&tab("solucoes")).await.unwrap();

    assert_eq!(before, after);
    assert_eq!(source.lookups(), 2);
    assert!(loader.is_cached(&tab("solucoes")));
}

#[tokio::test]
async fn fresh_loader_populates_exactly_one_entry() {
    let source = CountingSource::open();
    let loader = ContentLoader::new(source.clone());
    assert!(loader.cached_tabs().is_empty());

    loader.request_content(&tab("teoria")).await.unwrap();

    assert_eq!(loader.cached_tabs(), vec![tab("teoria")]);
}

#[tokio::test]
async fn tabs_do_not_interfere() {
    let source = CountingSource::gated();
    let loader = ContentLoader::new(source.clone());

    let teoria = loader.request_content(&tab("teoria"));
    let exercicios = loader.request_content(&tab("exercicios"));
    assert!(!teoria.ptr_eq(&exercicios));

    source.release(2);
    let (teoria, exercicios) = tokio::join!(teoria, exercicios);

    assert_eq!(&*teoria.unwrap(), "<h2>teoria</h2>");
    assert_eq!(&*exercicios.unwrap(), "<h2>exercicios</h2>");
    assert_eq!(source.lookups(), 2);
    assert_eq!(loader.cached_tabs(), vec![tab("exercicios"), tab("teoria")]);

    loader.invalidate(&tab("exercicios"));
    assert!(loader.is_cached(&tab("teoria")));
}

#[tokio::test]
async fn failing_tab_leaves_other_tabs_alone() {
    let source = CountingSource::gated();
    let loader = ContentLoader::new(source.clone());

    let teoria = loader.request_content(&tab("teoria"));
    let bogus = loader.request_content(&tab("bogus"));

    source.release(2);
    let (teoria, bogus) = tokio::join!(teoria, bogus);

    assert!(teoria.is_ok());
    assert!(bogus.is_err());
    assert_eq!(loader.cached_tabs(), vec![tab("teoria")]);
}

#[tokio::test]
async fn invalidate_leaves_in_flight_resolution_alone() {
    let source = CountingSource::gated();
    let loader = ContentLoader::new(source.clone());

    let pending = loader.request_content(&tab("teoria"));
    loader.invalidate_all();
    let joined = loader.request_content(&tab("teoria"));
    assert!(pending.ptr_eq(&joined));

    source.release(1);
    joined.await.unwrap();
    assert!(loader.is_cached(&tab("teoria")));
    assert_eq!(source.lookups(), 1);
}
