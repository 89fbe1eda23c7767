/// Metrics and monitoring for the proxy and the warm-up job
///
/// Tracks request counts, success rates and cache behavior per component

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentMetrics {
    pub component: String,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl ComponentMetrics {
    pub fn new(component: String) -> Self {
        Self {
            component,
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            cache_hits: 0,
            cache_misses: 0,
            last_success: None,
            last_failure: None,
            last_error: None,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            (self.successful_requests as f64 / self.total_requests as f64) * 100.0
        }
    }

    pub fn record_success(&mut self) {
        self.total_requests += 1;
        self.successful_requests += 1;
        self.last_success = Some(Utc::now());
    }

    pub fn record_failure(&mut self, error: String) {
        self.total_requests += 1;
        self.failed_requests += 1;
        self.last_failure = Some(Utc::now());
        self.last_error = Some(error);
    }
}

/// Global metrics tracker, shared across handlers and the warm job
#[derive(Clone)]
pub struct MetricsTracker {
    metrics: Arc<Mutex<HashMap<String, ComponentMetrics>>>,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn record_success(&self, component: &str) {
        let mut metrics = self.metrics.lock().unwrap();
        metrics
            .entry(component.to_string())
            .or_insert_with(|| ComponentMetrics::new(component.to_string()))
            .record_success();
    }

    pub fn record_failure(&self, component: &str, error: &str) {
        let mut metrics = self.metrics.lock().unwrap();
        let component_metrics = metrics
            .entry(component.to_string())
            .or_insert_with(|| ComponentMetrics::new(component.to_string()));
        component_metrics.record_failure(error.to_string());

        log::debug!(
            "[{}] failure: {} - success rate: {:.2}%",
            component,
            error,
            component_metrics.success_rate()
        );
    }

    pub fn record_cache_hit(&self, component: &str) {
        let mut metrics = self.metrics.lock().unwrap();
        metrics
            .entry(component.to_string())
            .or_insert_with(|| ComponentMetrics::new(component.to_string()))
            .cache_hits += 1;
    }

    pub fn record_cache_miss(&self, component: &str) {
        let mut metrics = self.metrics.lock().unwrap();
        metrics
            .entry(component.to_string())
            .or_insert_with(|| ComponentMetrics::new(component.to_string()))
            .cache_misses += 1;
    }

    pub fn get_metrics(&self, component: &str) -> Option<ComponentMetrics> {
        let metrics = self.metrics.lock().unwrap();
        metrics.get(component).cloned()
    }

    pub fn get_all_metrics(&self) -> Vec<ComponentMetrics> {
        let metrics = self.metrics.lock().unwrap();
        metrics.values().cloned().collect()
    }

    pub fn export_json(&self) -> String {
        let metrics = self.metrics.lock().unwrap();
        serde_json::to_string_pretty(&*metrics).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}
