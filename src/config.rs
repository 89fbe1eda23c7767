use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub warmer: WarmerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Host to bind the HTTP server on
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// First port to try when binding
    #[serde(default = "default_port_start")]
    pub port_start: u16,

    /// Last port to try when binding
    #[serde(default = "default_port_end")]
    pub port_end: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProxyConfig {
    /// Shared secret for signed-URL verification
    #[serde(default = "default_secret")]
    pub secret: String,

    /// Origin base URL for the HD page variant, tried first
    #[serde(default = "default_origin_hd_base")]
    pub origin_hd_base: String,

    /// Origin base URL for the fallback page variant
    #[serde(default = "default_origin_base")]
    pub origin_base: String,

    /// Fixed Referer sent to the origin and baked into cache keys
    #[serde(default = "default_referer")]
    pub referer: String,

    /// Fixed User-Agent sent to the origin
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// TTL applied to cached assets and advertised in Cache-Control
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Upper bound on total cached asset bytes held in memory
    #[serde(default = "default_max_cached_bytes")]
    pub max_cached_bytes: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WarmerConfig {
    /// Enable the recurring catalog warm-up job
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// URL of the external catalog JSON feed
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,

    /// Client-side timeout for the catalog fetch in seconds
    #[serde(default = "default_catalog_timeout")]
    pub catalog_timeout_secs: u64,

    /// Number of consecutive pages warmed concurrently per round
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Soft wall-clock budget per warm invocation in seconds
    #[serde(default = "default_time_budget")]
    pub time_budget_secs: u64,

    /// Delay between warm invocations in seconds
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Path of the persisted traversal checkpoint
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: String,
}

fn default_true() -> bool { true }
fn default_bind_host() -> String { "127.0.0.1".to_string() }
fn default_port_start() -> u16 { 8080 }
fn default_port_end() -> u16 { 8090 }
fn default_secret() -> String { "change-me-secret".to_string() }
fn default_origin_hd_base() -> String { "https://official-hd.lowee.us".to_string() }
fn default_origin_base() -> String { "https://official.lowee.us".to_string() }
fn default_referer() -> String { "https://mangadex.org/".to_string() }
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
        .to_string()
}
fn default_cache_ttl() -> u64 { 604_800 }
fn default_max_cached_bytes() -> u64 { 512 * 1024 * 1024 }
fn default_catalog_url() -> String { "https://official.lowee.us/catalog.json".to_string() }
fn default_catalog_timeout() -> u64 { 10 }
fn default_batch_size() -> u32 { 5 }
fn default_time_budget() -> u64 { 24 }
fn default_interval() -> u64 { 60 }
fn default_checkpoint_path() -> String { "warm_checkpoint.json".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
            port_start: default_port_start(),
            port_end: default_port_end(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            secret: default_secret(),
            origin_hd_base: default_origin_hd_base(),
            origin_base: default_origin_base(),
            referer: default_referer(),
            user_agent: default_user_agent(),
            cache_ttl_secs: default_cache_ttl(),
            max_cached_bytes: default_max_cached_bytes(),
        }
    }
}

impl Default for WarmerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            catalog_url: default_catalog_url(),
            catalog_timeout_secs: default_catalog_timeout(),
            batch_size: default_batch_size(),
            time_budget_secs: default_time_budget(),
            interval_secs: default_interval(),
            checkpoint_path: default_checkpoint_path(),
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let path = Path::new("config.toml");
        if path.exists() {
            if let Ok(content) = fs::read_to_string(path) {
                if let Ok(cfg) = toml::from_str::<Config>(&content) {
                    return cfg;
                }
            }
        }
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.warmer.batch_size, 5);
        assert_eq!(cfg.warmer.time_budget_secs, 24);
        assert_eq!(cfg.warmer.catalog_timeout_secs, 10);
        assert_eq!(cfg.server.port_start, 8080);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [warmer]
            batch_size = 8
            "#,
        )
        .unwrap();
        assert_eq!(cfg.warmer.batch_size, 8);
        assert_eq!(cfg.warmer.time_budget_secs, 24);
        assert!(!cfg.proxy.secret.is_empty());
    }
}
