//! # Application State Management
//!
//! This module manages shared state that needs to be accessed by multiple HTTP
//! request handlers simultaneously.
//!
//! ## The Arc<RwLock<T>> Pattern:
//! - **Arc**: Multiple ownership (many HTTP handlers can hold a reference)
//! - **RwLock**: Multiple readers OR one writer at a time (thread-safe)
//! - **T**: The actual data type being protected
//!
//! Configuration and metrics both use this pattern: requests read the config
//! concurrently while the config endpoint occasionally writes it, and every
//! request updates the metrics.
//!
//! The recognition backend is shared as `Arc<dyn SpeechRecognizer>` — it's
//! immutable after startup, so no lock is needed around it.

use crate::config::AppConfig;
use crate::recognition::SpeechRecognizer;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// The main application state that's shared across all HTTP request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration (can be updated at runtime)
    pub config: Arc<RwLock<AppConfig>>,

    /// Performance metrics (constantly being updated by requests)
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started (never changes, so no lock needed)
    pub start_time: Instant,

    /// The speech-recognition backend used for every upload
    recognizer: Arc<dyn SpeechRecognizer>,
}

/// Performance metrics collected across all HTTP requests.
///
/// ## Why these metrics matter:
/// - **request_count**: Total requests processed (for load monitoring)
/// - **error_count**: Total errors (for reliability monitoring)
/// - **active_uploads**: Uploads currently in flight (for capacity planning)
/// - **endpoint_metrics**: Per-endpoint statistics (for performance tuning)
#[derive(Debug, Default)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start
    pub request_count: u64,

    /// Total number of errors encountered since server start
    pub error_count: u64,

    /// Number of transcription uploads currently being processed
    pub active_uploads: u32,

    /// Detailed metrics for each API endpoint, keyed by "METHOD /path"
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Detailed performance metrics for a specific API endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    /// Number of requests to this specific endpoint
    pub request_count: u64,

    /// Total time spent processing all requests to this endpoint (milliseconds)
    pub total_duration_ms: u64,

    /// Number of errors that occurred for this endpoint
    pub error_count: u64,
}

impl AppState {
    /// Create a new AppState from the loaded configuration and the
    /// recognition backend built at startup.
    pub fn new(config: AppConfig, recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
            recognizer,
        }
    }

    /// Get a copy of the current configuration.
    ///
    /// Cloning releases the read lock immediately, so other threads aren't
    /// blocked while the caller works with the snapshot.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    /// Update the configuration with validation.
    pub fn update_config(&self, new_config: AppConfig) -> Result<(), String> {
        match new_config.validate() {
            Ok(_) => {
                *self.config.write().unwrap() = new_config;
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        }
    }

    /// The shared recognition backend.
    pub fn recognizer(&self) -> Arc<dyn SpeechRecognizer> {
        Arc::clone(&self.recognizer)
    }

    /// Increment the total request counter (called by middleware for every request).
    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    /// Increment the total error counter (called when any request fails).
    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    /// Record detailed metrics for a specific endpoint.
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();

        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;

        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Increment the in-flight upload gauge (a transcription request started).
    pub fn increment_active_uploads(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.active_uploads += 1;
    }

    /// Decrement the in-flight upload gauge (a transcription request finished).
    ///
    /// Guarded against underflow so a double-decrement bug can't panic.
    pub fn decrement_active_uploads(&self) {
        let mut metrics = self.metrics.write().unwrap();
        if metrics.active_uploads > 0 {
            metrics.active_uploads -= 1;
        }
    }

    /// Get a snapshot of current metrics (used for the /metrics endpoint).
    ///
    /// Clones the data so the lock isn't held while the HTTP response is
    /// being serialized.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            active_uploads: metrics.active_uploads,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    /// Get server uptime in seconds.
    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    /// Average response time for this endpoint in milliseconds.
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// Error rate for this endpoint (0.0 to 1.0).
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}
