//! External catalog feed
//!
//! The catalog is a JSON array of `{name, chapters}` fetched fresh at the
//! start of every warm invocation. Any failure (transport, timeout, bad
//! status, malformed payload) means "no catalog available this run"; the
//! caller no-ops and leaves the checkpoint untouched.

use crate::config::WarmerConfig;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// One catalog entry: the identifier used to build origin URLs and the total
/// chapter count bounding the chapter loop.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub chapters: u32,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("catalog returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("catalog payload malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<CatalogEntry>, CatalogError>;
}

pub struct HttpCatalog {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpCatalog {
    pub fn new(client: reqwest::Client, cfg: &WarmerConfig) -> Self {
        Self {
            client,
            url: cfg.catalog_url.clone(),
            timeout: Duration::from_secs(cfg.catalog_timeout_secs),
        }
    }
}

#[async_trait]
impl CatalogSource for HttpCatalog {
    async fn fetch(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CatalogError::Status(response.status()));
        }
        let raw = response.text().await?;
        let entries: Vec<CatalogEntry> = serde_json::from_str(&raw)?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_entry_shape() {
        let entries: Vec<CatalogEntry> =
            serde_json::from_str(r#"[{"name":"one-piece","chapters":1100}]"#).unwrap();
        assert_eq!(entries[0].name, "one-piece");
        assert_eq!(entries[0].chapters, 1100);
    }

    #[test]
    fn test_shape_violation_is_error() {
        let result = serde_json::from_str::<Vec<CatalogEntry>>(r#"{"name":"not-an-array"}"#);
        assert!(result.is_err());
    }
}
