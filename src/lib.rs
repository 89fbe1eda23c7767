// Library interface for manga-edge-proxy
// This allows tests and external crates to use the proxy and warmer components

pub mod app_state;
pub mod cache;
pub mod catalog;
pub mod checkpoint;
pub mod config;
pub mod metrics;
pub mod origin;
pub mod proxy;
pub mod signature;
pub mod warmer;
