//! Application state for the Actix-web server
//!
//! This module defines the shared state used across all HTTP handlers.
//! The `AppState` struct is wrapped in `web::Data` and provides thread-safe
//! access to the edge cache, origin client, warm-up job and metrics.

use crate::cache::AssetCache;
use crate::config::Config;
use crate::metrics::MetricsTracker;
use crate::origin::Origin;
use crate::warmer::Warmer;
use std::sync::Arc;
use tokio_util::task::TaskTracker;

/// Shared application state for Actix-web handlers
pub struct AppState {
    /// Application configuration (injected everywhere, no globals)
    pub config: Config,
    /// In-memory edge cache for page assets
    pub cache: AssetCache,
    /// Upstream origin client shared by the proxy path
    pub origin: Arc<dyn Origin>,
    /// Metrics tracker for proxy and warmer behavior
    pub metrics: MetricsTracker,
    /// Catalog warm-up job, also queried by the status page
    pub warmer: Arc<Warmer>,
    /// Background cache writes scheduled by the proxy; drained before exit
    pub cache_writes: TaskTracker,
}
