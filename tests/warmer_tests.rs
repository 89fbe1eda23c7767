use async_trait::async_trait;
use bytes::Bytes;
use manga_edge_proxy::cache::PageAsset;
use manga_edge_proxy::catalog::{CatalogEntry, CatalogError, CatalogSource};
use manga_edge_proxy::checkpoint::{Checkpoint, CheckpointStore, MemoryCheckpointStore};
use manga_edge_proxy::config::{ProxyConfig, WarmerConfig};
use manga_edge_proxy::metrics::MetricsTracker;
use manga_edge_proxy::origin::{page_file_name, page_url_variants, Origin};
use manga_edge_proxy::warmer::{BatchOutcome, RunOutcome, Warmer};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Origin stub that serves a fixed set of URLs and records every fetch
struct ScriptedOrigin {
    available: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedOrigin {
    fn new() -> Self {
        Self {
            available: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make `count` consecutive pages of a chapter fetchable via the HD variant
    fn with_pages(mut self, cfg: &ProxyConfig, name: &str, chapter: u32, count: u32) -> Self {
        for page in 0..count {
            let file = page_file_name(page);
            let mut variants = page_url_variants(cfg, name, &chapter.to_string(), &file);
            self.available.insert(variants.swap_remove(0));
        }
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Origin for ScriptedOrigin {
    async fn fetch(&self, url: &str) -> Option<PageAsset> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.available.contains(url) {
            Some(PageAsset {
                body: Bytes::from_static(b"img"),
                content_type: Some("image/png".to_string()),
            })
        } else {
            None
        }
    }
}

struct StaticCatalog(Vec<CatalogEntry>);

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn fetch(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        Ok(self.0.clone())
    }
}

struct FailingCatalog;

#[async_trait]
impl CatalogSource for FailingCatalog {
    async fn fetch(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        Err(CatalogError::Status(reqwest::StatusCode::BAD_GATEWAY))
    }
}

fn catalog(entries: &[(&str, u32)]) -> Vec<CatalogEntry> {
    entries
        .iter()
        .map(|(name, chapters)| CatalogEntry {
            name: name.to_string(),
            chapters: *chapters,
        })
        .collect()
}

fn warmer_cfg(time_budget_secs: u64) -> WarmerConfig {
    WarmerConfig {
        batch_size: 5,
        time_budget_secs,
        ..WarmerConfig::default()
    }
}

fn build_warmer(
    origin: Arc<ScriptedOrigin>,
    entries: Vec<CatalogEntry>,
    store: Arc<MemoryCheckpointStore>,
    time_budget_secs: u64,
) -> Warmer {
    Warmer::new(
        origin,
        Arc::new(StaticCatalog(entries)),
        store,
        ProxyConfig::default(),
        warmer_cfg(time_budget_secs),
        MetricsTracker::new(),
    )
}

#[tokio::test]
async fn test_resume_skips_already_warmed_content() {
    let cfg = ProxyConfig::default();
    // Manga "a" has 2 chapters; chapter 2 has pages at offsets 0..=4 but we
    // resume from offset 3, so only 3 and 4 should ever be requested.
    let origin = Arc::new(ScriptedOrigin::new().with_pages(&cfg, "a", 2, 5));
    let store = Arc::new(MemoryCheckpointStore::new());
    store
        .save(&Checkpoint {
            manga_idx: 0,
            chapter_idx: 2,
            page_idx: 3,
        })
        .unwrap();

    let warmer = build_warmer(origin.clone(), catalog(&[("a", 2)]), store.clone(), 3600);
    let outcome = warmer.run_once().await.unwrap();
    assert_eq!(outcome, RunOutcome::PassComplete);

    let calls = origin.calls();
    assert!(!calls.is_empty());
    for url in &calls {
        assert!(
            !url.contains("/manga/a/1/"),
            "chapter 1 must never be touched on resume: {}",
            url
        );
        for warmed in ["001.png", "002.png", "003.png"] {
            assert!(
                !(url.contains("/manga/a/2/") && url.ends_with(warmed)),
                "pages before the resume offset must not be re-attempted: {}",
                url
            );
        }
    }
}

#[tokio::test]
async fn test_first_failed_page_ends_the_chapter() {
    let cfg = ProxyConfig::default();
    let mut origin = ScriptedOrigin::new().with_pages(&cfg, "a", 1, 5);
    // Remove offset 2 so the batch sees pages [ok, ok, miss, ok, ok]
    let gone = page_url_variants(&cfg, "a", "1", &page_file_name(2))[0].clone();
    origin.available.remove(&gone);
    let origin = Arc::new(origin);

    let warmer = build_warmer(
        origin,
        catalog(&[("a", 1)]),
        Arc::new(MemoryCheckpointStore::new()),
        3600,
    );
    let outcome = warmer.warm_batch("a", 1, 0).await;
    assert_eq!(outcome, BatchOutcome::Ended { first_missing: 2 });
}

#[tokio::test]
async fn test_fully_successful_batch_advances() {
    let cfg = ProxyConfig::default();
    let origin = Arc::new(ScriptedOrigin::new().with_pages(&cfg, "a", 1, 5));
    let warmer = build_warmer(
        origin,
        catalog(&[("a", 1)]),
        Arc::new(MemoryCheckpointStore::new()),
        3600,
    );
    assert_eq!(warmer.warm_batch("a", 1, 0).await, BatchOutcome::Advanced);
}

#[tokio::test]
async fn test_budget_halt_persists_post_round_offset() {
    let cfg = ProxyConfig::default();
    // Chapter 3 has pages at offsets 10..=14; a zero budget expires right
    // after the first round, which advanced the offset from 10 to 15.
    let mut origin = ScriptedOrigin::new();
    for page in 10..15 {
        let mut variants = page_url_variants(&cfg, "a", "3", &page_file_name(page));
        origin.available.insert(variants.swap_remove(0));
    }
    let store = Arc::new(MemoryCheckpointStore::new());
    store
        .save(&Checkpoint {
            manga_idx: 0,
            chapter_idx: 3,
            page_idx: 10,
        })
        .unwrap();

    let warmer = build_warmer(Arc::new(origin), catalog(&[("a", 3)]), store.clone(), 0);
    let outcome = warmer.run_once().await.unwrap();
    assert_eq!(outcome, RunOutcome::Halted);
    assert_eq!(
        store.last(),
        Some(Checkpoint {
            manga_idx: 0,
            chapter_idx: 3,
            page_idx: 15,
        })
    );
}

#[tokio::test]
async fn test_full_pass_resets_checkpoint() {
    let cfg = ProxyConfig::default();
    // Two manga, one chapter each: "a" has 2 pages, "b" has none at all.
    let origin = Arc::new(ScriptedOrigin::new().with_pages(&cfg, "a", 1, 2));
    let store = Arc::new(MemoryCheckpointStore::new());

    let warmer = build_warmer(
        origin,
        catalog(&[("a", 1), ("b", 1)]),
        store.clone(),
        3600,
    );
    let outcome = warmer.run_once().await.unwrap();
    assert_eq!(outcome, RunOutcome::PassComplete);
    assert_eq!(store.last(), Some(Checkpoint::default()));

    let progress = warmer.progress();
    assert_eq!(progress.passes_completed, 1);
    assert_eq!(progress.pages_warmed, 2);
    assert!(!progress.in_progress);
}

#[tokio::test]
async fn test_catalog_unavailable_is_a_no_op() {
    let store = Arc::new(MemoryCheckpointStore::new());
    let before = Checkpoint {
        manga_idx: 1,
        chapter_idx: 2,
        page_idx: 3,
    };
    store.save(&before).unwrap();

    let origin = Arc::new(ScriptedOrigin::new());
    let warmer = Warmer::new(
        origin.clone(),
        Arc::new(FailingCatalog),
        store.clone(),
        ProxyConfig::default(),
        warmer_cfg(3600),
        MetricsTracker::new(),
    );
    let outcome = warmer.run_once().await.unwrap();
    assert_eq!(outcome, RunOutcome::CatalogUnavailable);
    assert_eq!(store.last(), Some(before), "checkpoint must be untouched");
    assert!(origin.calls().is_empty(), "no warm fetches may be issued");
}
