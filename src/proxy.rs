//! Read-through cache-fill proxy
//!
//! Serves a page asset from the edge cache when present, otherwise walks the
//! ordered origin URL variants, returns the first success to the caller and
//! schedules the cache write in the background. The caller-visible response is
//! never delayed by the write; the write is spawned on a `TaskTracker` that
//! the process drains before exiting, so it is always initiated and always
//! allowed to finish.

use crate::cache::{cache_key, AssetCache, PageAsset};
use crate::config::ProxyConfig;
use crate::origin::Origin;
use log::debug;
use std::sync::Arc;
use tokio_util::task::TaskTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    /// Value of the `X-Proxy-Cache` diagnostic header
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

pub struct ProxyResponse {
    pub asset: Arc<PageAsset>,
    pub cache_status: CacheStatus,
}

/// Serve one asset given its ordered URL variants.
///
/// Returns `None` when every variant misses both the cache and the origin;
/// the HTTP layer maps that to 404.
pub async fn serve_asset(
    cache: &AssetCache,
    origin: &dyn Origin,
    writes: &TaskTracker,
    cfg: &ProxyConfig,
    variants: &[String],
) -> Option<ProxyResponse> {
    for url in variants {
        let key = cache_key(url, &cfg.referer);
        if let Some(asset) = cache.get(&key).await {
            debug!("cache hit for {}", url);
            return Some(ProxyResponse {
                asset,
                cache_status: CacheStatus::Hit,
            });
        }
        if let Some(asset) = origin.fetch(url).await {
            let asset = Arc::new(asset);
            let write_cache = cache.clone();
            let write_asset = asset.clone();
            writes.spawn(async move {
                write_cache.insert(key, write_asset).await;
            });
            debug!("cache miss filled from {}", url);
            return Some(ProxyResponse {
                asset,
                cache_status: CacheStatus::Miss,
            });
        }
    }
    None
}
