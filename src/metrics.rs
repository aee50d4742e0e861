//! Serving metrics and statistics tracking

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for the serving pipeline.
///
/// Mismatched-length inputs get a dedicated counter: the truncate/pad shim
/// lets them through, but they are not equivalent to exact-length traffic
/// and operators need to see them separately.
pub struct ServingMetrics {
    /// Total requests received at the dispatcher
    pub requests_received: AtomicU64,
    /// Predictions served successfully
    pub predictions_served: AtomicU64,
    /// Inputs that needed truncation or zero-padding
    pub length_mismatches: AtomicU64,
    /// Responses by HTTP status code
    responses_by_status: RwLock<HashMap<u16, u64>>,
    /// Predictions by risk tier
    predictions_by_tier: RwLock<HashMap<String, u64>>,
    /// Request handling times (in microseconds)
    handling_times: RwLock<Vec<u64>>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ServingMetrics {
    pub fn new() -> Self {
        Self {
            requests_received: AtomicU64::new(0),
            predictions_served: AtomicU64::new(0),
            length_mismatches: AtomicU64::new(0),
            responses_by_status: RwLock::new(HashMap::new()),
            predictions_by_tier: RwLock::new(HashMap::new()),
            handling_times: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record an inbound request.
    pub fn record_request(&self) {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of a handled request.
    pub fn record_response(&self, status: u16, handling_time: Duration) {
        if let Ok(mut by_status) = self.responses_by_status.write() {
            *by_status.entry(status).or_insert(0) += 1;
        }

        if let Ok(mut times) = self.handling_times.write() {
            times.push(handling_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    /// Record a successfully served prediction.
    pub fn record_prediction(&self, risk_level: &str) {
        self.predictions_served.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_tier) = self.predictions_by_tier.write() {
            *by_tier.entry(risk_level.to_string()).or_insert(0) += 1;
        }
    }

    /// Record an input whose length did not match the model contract.
    pub fn record_length_mismatch(&self) {
        self.length_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    /// Get request handling time statistics.
    pub fn get_handling_stats(&self) -> HandlingStats {
        let times = self.handling_times.read().unwrap();
        if times.is_empty() {
            return HandlingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        HandlingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
        }
    }

    /// Get current throughput (requests per second).
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests_received.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Snapshot of all counters, served on the metrics endpoint.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_received: self.requests_received.load(Ordering::Relaxed),
            predictions_served: self.predictions_served.load(Ordering::Relaxed),
            length_mismatches: self.length_mismatches.load(Ordering::Relaxed),
            responses_by_status: self.responses_by_status.read().unwrap().clone(),
            predictions_by_tier: self.predictions_by_tier.read().unwrap().clone(),
            throughput_rps: self.get_throughput(),
            handling: self.get_handling_stats(),
        }
    }

    /// Print summary statistics.
    pub fn print_summary(&self) {
        let requests = self.requests_received.load(Ordering::Relaxed);
        let served = self.predictions_served.load(Ordering::Relaxed);
        let mismatches = self.length_mismatches.load(Ordering::Relaxed);
        let handling = self.get_handling_stats();
        let by_tier = self.predictions_by_tier.read().unwrap().clone();

        info!(
            requests = requests,
            predictions_served = served,
            length_mismatches = mismatches,
            throughput_rps = format!("{:.1}", self.get_throughput()),
            "Serving metrics summary"
        );
        info!(
            mean_us = handling.mean_us,
            p50_us = handling.p50_us,
            p95_us = handling.p95_us,
            p99_us = handling.p99_us,
            "Request handling time"
        );
        for (tier, count) in &by_tier {
            info!(risk_level = %tier, count = count, "Predictions by risk tier");
        }
    }
}

impl Default for ServingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Request handling time statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct HandlingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
}

/// Point-in-time view of all serving counters
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_received: u64,
    pub predictions_served: u64,
    pub length_mismatches: u64,
    pub responses_by_status: HashMap<u16, u64>,
    pub predictions_by_tier: HashMap<String, u64>,
    pub throughput_rps: f64,
    pub handling: HandlingStats,
}

/// Periodic reporter that logs a metrics summary.
pub struct MetricsReporter {
    metrics: std::sync::Arc<ServingMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: std::sync::Arc<ServingMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task.
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
