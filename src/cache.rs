//! In-memory edge cache for page assets
//!
//! Backed by `moka::future::Cache`, which is async-safe and lock-free on the
//! read path, with size-based eviction and a TTL matching the Cache-Control
//! the proxy advertises. Keys are canonicalized from the origin URL variant
//! plus the fixed Referer, so warm-up traffic and user-facing requests for the
//! same asset variant converge on the same entry regardless of what headers
//! the caller sent.

use bytes::Bytes;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// One cached page image, stored finalized (body fully read)
#[derive(Debug, Clone)]
pub struct PageAsset {
    pub body: Bytes,
    pub content_type: Option<String>,
}

/// Canonical cache key for an asset variant
pub fn cache_key(url: &str, referer: &str) -> String {
    format!("{}|referer={}", url, referer)
}

#[derive(Clone)]
pub struct AssetCache {
    inner: Cache<String, Arc<PageAsset>>,
}

impl AssetCache {
    pub fn new(max_bytes: u64, ttl: Duration) -> Self {
        let inner = Cache::builder()
            // Weight entries by body size so max_capacity bounds total bytes
            .weigher(|_key: &String, asset: &Arc<PageAsset>| {
                asset.body.len().min(u32::MAX as usize) as u32
            })
            .max_capacity(max_bytes)
            .time_to_live(ttl)
            .build();
        Self { inner }
    }

    pub async fn get(&self, key: &str) -> Option<Arc<PageAsset>> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: String, asset: Arc<PageAsset>) {
        self.inner.insert(key, asset).await;
    }
}
