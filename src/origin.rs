//! Origin URL variants and the upstream fetch seam
//!
//! Every page asset has an ordered list of candidate origin URLs (the HD
//! variant first, then the fallback). The proxy and the warm-up job build
//! their URLs through the same functions so both paths hit identical origin
//! objects and cache keys.

use crate::cache::PageAsset;
use crate::config::ProxyConfig;
use async_trait::async_trait;
use log::debug;

/// Ordered origin URL candidates for one page file
pub fn page_url_variants(cfg: &ProxyConfig, manga: &str, chapter: &str, file: &str) -> Vec<String> {
    vec![
        format!("{}/manga/{}/{}/{}", cfg.origin_hd_base, manga, chapter, file),
        format!("{}/manga/{}/{}/{}", cfg.origin_base, manga, chapter, file),
    ]
}

/// Image file name for a 0-based page offset (offset 0 is `001.png`)
pub fn page_file_name(page_offset: u32) -> String {
    format!("{:03}.png", page_offset + 1)
}

/// Upstream fetch boundary. A successful fetch has fully drained the body,
/// which is what lets the origin's own edge cache store the complete object.
#[async_trait]
pub trait Origin: Send + Sync {
    /// Fetch one URL variant. Any transport error or non-2xx status is `None`.
    async fn fetch(&self, url: &str) -> Option<PageAsset>;
}

/// Reqwest-backed origin client with the fixed Referer and User-Agent
pub struct HttpOrigin {
    client: reqwest::Client,
    referer: String,
    user_agent: String,
}

impl HttpOrigin {
    pub fn new(client: reqwest::Client, cfg: &ProxyConfig) -> Self {
        Self {
            client,
            referer: cfg.referer.clone(),
            user_agent: cfg.user_agent.clone(),
        }
    }
}

#[async_trait]
impl Origin for HttpOrigin {
    async fn fetch(&self, url: &str) -> Option<PageAsset> {
        let response = match self
            .client
            .get(url)
            .header("Referer", &self.referer)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                debug!("origin fetch error for {}: {}", url, e);
                return None;
            }
        };
        if !response.status().is_success() {
            debug!("origin returned {} for {}", response.status(), url);
            return None;
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        match response.bytes().await {
            Ok(body) => Some(PageAsset { body, content_type }),
            Err(e) => {
                debug!("origin body read failed for {}: {}", url, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_order_is_hd_first() {
        let cfg = ProxyConfig::default();
        let variants = page_url_variants(&cfg, "one-piece", "12", "004.png");
        assert_eq!(variants.len(), 2);
        assert!(variants[0].starts_with(&cfg.origin_hd_base));
        assert!(variants[1].starts_with(&cfg.origin_base));
        assert!(variants[0].ends_with("/manga/one-piece/12/004.png"));
    }

    #[test]
    fn test_page_file_name_is_one_based_padded() {
        assert_eq!(page_file_name(0), "001.png");
        assert_eq!(page_file_name(9), "010.png");
        assert_eq!(page_file_name(122), "123.png");
    }
}
