//! Resumable catalog warm-up job
//!
//! Walks the catalog manga → chapter → page, warming a fixed-size batch of
//! pages concurrently per round, under a soft wall-clock budget. The traversal
//! position is an explicit state machine driven by one transition per batch,
//! so resumption from a persisted checkpoint is mechanical: load the triple,
//! normalize it against the freshly fetched catalog, keep stepping until the
//! budget expires or the catalog is exhausted.
//!
//! A failed page fetch (including a transient network error) is read as
//! end-of-chapter and is not retried. That heuristic is how the upstream
//! system detects end of content; a spurious failure mid-chapter terminates
//! the chapter early and the pass moves on.

use crate::catalog::{CatalogEntry, CatalogSource};
use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::config::{ProxyConfig, WarmerConfig};
use crate::metrics::MetricsTracker;
use crate::origin::{page_file_name, page_url_variants, Origin};
use chrono::Utc;
use futures::future::join_all;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WarmError {
    #[error("checkpoint write failed: {0}")]
    Checkpoint(#[from] std::io::Error),
}

/// Result of one concurrent batch round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every page in the batch warmed; the chapter continues past it
    Advanced,
    /// Offset of the first page that failed. Read as the end of the chapter.
    Ended { first_missing: u32 },
}

/// Traversal position between batch rounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    ScanningManga { manga: usize },
    ScanningChapter { manga: usize, chapter: u32 },
    ScanningPage { manga: usize, chapter: u32, page: u32 },
    PassComplete,
}

impl From<Checkpoint> for ScanState {
    fn from(checkpoint: Checkpoint) -> Self {
        ScanState::ScanningPage {
            manga: checkpoint.manga_idx,
            chapter: checkpoint.chapter_idx,
            page: checkpoint.page_idx,
        }
    }
}

impl ScanState {
    /// Resolve intermediate states and out-of-range coordinates against the
    /// catalog, yielding either a concrete page position or pass completion.
    /// Manga whose chapter count is already exceeded (including zero-chapter
    /// entries) are skipped with the page offset reset.
    pub fn normalize(self, catalog: &[CatalogEntry]) -> ScanState {
        let (mut manga, mut chapter, mut page) = match self {
            ScanState::ScanningManga { manga } => (manga, 1, 0),
            ScanState::ScanningChapter { manga, chapter } => (manga, chapter, 0),
            ScanState::ScanningPage { manga, chapter, page } => (manga, chapter, page),
            ScanState::PassComplete => return ScanState::PassComplete,
        };
        loop {
            match catalog.get(manga) {
                None => return ScanState::PassComplete,
                Some(entry) if chapter > entry.chapters => {
                    manga += 1;
                    chapter = 1;
                    page = 0;
                }
                Some(_) => return ScanState::ScanningPage { manga, chapter, page },
            }
        }
    }

    /// Transition after one batch round at the current page position.
    pub fn on_batch(
        self,
        outcome: BatchOutcome,
        batch_size: u32,
        catalog: &[CatalogEntry],
    ) -> ScanState {
        match self {
            ScanState::ScanningPage { manga, chapter, page } => match outcome {
                BatchOutcome::Advanced => ScanState::ScanningPage {
                    manga,
                    chapter,
                    page: page + batch_size,
                },
                BatchOutcome::Ended { .. } => ScanState::ScanningChapter {
                    manga,
                    chapter: chapter + 1,
                }
                .normalize(catalog),
            },
            other => other,
        }
    }

    /// Project the state back onto the persisted checkpoint triple.
    /// Pass completion maps to the start-of-catalog position, marking the
    /// next scheduled run as the start of a new pass.
    pub fn checkpoint(self) -> Checkpoint {
        match self {
            ScanState::ScanningManga { manga } => Checkpoint {
                manga_idx: manga,
                chapter_idx: 1,
                page_idx: 0,
            },
            ScanState::ScanningChapter { manga, chapter } => Checkpoint {
                manga_idx: manga,
                chapter_idx: chapter,
                page_idx: 0,
            },
            ScanState::ScanningPage { manga, chapter, page } => Checkpoint {
                manga_idx: manga,
                chapter_idx: chapter,
                page_idx: page,
            },
            ScanState::PassComplete => Checkpoint::default(),
        }
    }
}

/// Cooperative soft deadline, checked between batch rounds only
#[derive(Debug, Clone, Copy)]
pub struct TimeBudget {
    started: Instant,
    budget: Duration,
}

impl TimeBudget {
    pub fn start(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn expired(&self) -> bool {
        self.started.elapsed() >= self.budget
    }
}

/// How one warm invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Catalog feed unavailable or malformed; nothing was attempted and the
    /// checkpoint was left untouched
    CatalogUnavailable,
    /// Soft budget expired mid-catalog; the exact position was persisted
    Halted,
    /// The whole catalog was traversed; the checkpoint was reset
    PassComplete,
}

/// Progress snapshot surfaced on the status page
#[derive(Debug, Default, Serialize, Clone)]
pub struct WarmProgress {
    pub in_progress: bool,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
    pub current_manga: Option<String>,
    pub current_chapter: Option<u32>,
    pub pages_warmed: u64,
    pub passes_completed: u64,
    pub last_error: Option<String>,
}

pub struct Warmer {
    origin: Arc<dyn Origin>,
    catalog: Arc<dyn CatalogSource>,
    store: Arc<dyn CheckpointStore>,
    proxy_cfg: ProxyConfig,
    cfg: WarmerConfig,
    metrics: MetricsTracker,
    progress: Arc<Mutex<WarmProgress>>,
}

impl Warmer {
    pub fn new(
        origin: Arc<dyn Origin>,
        catalog: Arc<dyn CatalogSource>,
        store: Arc<dyn CheckpointStore>,
        proxy_cfg: ProxyConfig,
        cfg: WarmerConfig,
        metrics: MetricsTracker,
    ) -> Self {
        Self {
            origin,
            catalog,
            store,
            proxy_cfg,
            cfg,
            metrics,
            progress: Arc::new(Mutex::new(WarmProgress::default())),
        }
    }

    pub fn progress(&self) -> WarmProgress {
        self.progress.lock().unwrap().clone()
    }

    /// The currently persisted resume position
    pub fn checkpoint(&self) -> Checkpoint {
        self.store.load()
    }

    /// Warm one page by trying its URL variants in order. The fetch drains
    /// the body, which is what makes the origin edge store the object.
    async fn warm_page(&self, name: &str, chapter: u32, page: u32) -> bool {
        let file = page_file_name(page);
        let chapter_str = chapter.to_string();
        for url in page_url_variants(&self.proxy_cfg, name, &chapter_str, &file) {
            if self.origin.fetch(&url).await.is_some() {
                return true;
            }
        }
        false
    }

    /// Issue one concurrent batch of page warms starting at `start` and
    /// reduce to the first failed offset, if any.
    pub async fn warm_batch(&self, name: &str, chapter: u32, start: u32) -> BatchOutcome {
        let rounds = (0..self.cfg.batch_size).map(|k| self.warm_page(name, chapter, start + k));
        let results = join_all(rounds).await;
        match results.iter().position(|ok| !*ok) {
            None => BatchOutcome::Advanced,
            Some(k) => BatchOutcome::Ended {
                first_missing: start + k as u32,
            },
        }
    }

    /// One time-bounded warm invocation.
    pub async fn run_once(&self) -> Result<RunOutcome, WarmError> {
        let catalog = match self.catalog.fetch().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("catalog unavailable, skipping this run: {}", e);
                self.progress.lock().unwrap().last_error = Some(e.to_string());
                return Ok(RunOutcome::CatalogUnavailable);
            }
        };
        {
            let mut p = self.progress.lock().unwrap();
            p.in_progress = true;
            p.started_at = Some(Utc::now().timestamp());
            p.finished_at = None;
            p.last_error = None;
        }

        let budget = TimeBudget::start(Duration::from_secs(self.cfg.time_budget_secs));
        let mut state = ScanState::from(self.store.load()).normalize(&catalog);

        let outcome = loop {
            let ScanState::ScanningPage { manga, chapter, page } = state else {
                break RunOutcome::PassComplete;
            };
            let entry = &catalog[manga];
            {
                let mut p = self.progress.lock().unwrap();
                p.current_manga = Some(entry.name.clone());
                p.current_chapter = Some(chapter);
            }

            let batch = self.warm_batch(&entry.name, chapter, page).await;
            match batch {
                BatchOutcome::Advanced => {
                    self.record_warmed(self.cfg.batch_size as u64);
                }
                BatchOutcome::Ended { first_missing } => {
                    self.record_warmed((first_missing - page) as u64);
                    self.metrics
                        .record_failure("warmer", &format!("page miss at offset {}", first_missing));
                    debug!(
                        "chapter {} of {} ends at page offset {}",
                        chapter, entry.name, first_missing
                    );
                }
            }

            state = state.on_batch(batch, self.cfg.batch_size, &catalog);
            if matches!(state, ScanState::ScanningPage { .. }) && budget.expired() {
                let checkpoint = state.checkpoint();
                self.store.save(&checkpoint)?;
                info!(
                    "time budget exhausted, checkpoint saved at manga {} chapter {} page {}",
                    checkpoint.manga_idx, checkpoint.chapter_idx, checkpoint.page_idx
                );
                break RunOutcome::Halted;
            }
        };

        if outcome == RunOutcome::PassComplete {
            self.store.save(&Checkpoint::default())?;
            info!("catalog pass complete, checkpoint reset");
            self.progress.lock().unwrap().passes_completed += 1;
        }
        {
            let mut p = self.progress.lock().unwrap();
            p.in_progress = false;
            p.finished_at = Some(Utc::now().timestamp());
            p.current_manga = None;
            p.current_chapter = None;
        }
        Ok(outcome)
    }

    fn record_warmed(&self, count: u64) {
        if count > 0 {
            self.progress.lock().unwrap().pages_warmed += count;
            for _ in 0..count {
                self.metrics.record_success("warmer");
            }
        }
    }
}

/// Recurring background job: sleep, then run one warm invocation. Handled
/// failure modes never escape `run_once`; anything that does is logged here.
pub fn spawn(warmer: Arc<Warmer>) {
    let interval = Duration::from_secs(warmer.cfg.interval_secs);
    actix_web::rt::spawn(async move {
        loop {
            actix_web::rt::time::sleep(interval).await;
            if let Err(e) = warmer.run_once().await {
                error!("warm invocation failed: {}", e);
                warmer.progress.lock().unwrap().last_error = Some(e.to_string());
            }
        }
    });
}
