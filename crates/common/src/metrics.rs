//! Prometheus metrics owned by the running server.
//!
//! The registry lives in application state rather than the process-wide default
//! registry, so several servers (e.g. in tests) can coexist in one process.

use axum::http::StatusCode;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    operations: IntCounterVec,
    duration: HistogramVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();
        let operations = IntCounterVec::new(
            Opts::new("crm_graphql_operations_total", "GraphQL operations by outcome"),
            &["outcome"],
        )?;
        let duration = HistogramVec::new(
            HistogramOpts::new("crm_graphql_duration_seconds", "GraphQL operation duration in seconds")
                .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["outcome"],
        )?;
        registry.register(Box::new(operations.clone()))?;
        registry.register(Box::new(duration.clone()))?;
        Ok(Self { registry, operations, duration })
    }

    /// Record one executed operation; `outcome` is `ok` or the first error code.
    pub fn observe(&self, outcome: &str, seconds: f64) {
        self.operations.with_label_values(&[outcome]).inc();
        self.duration.with_label_values(&[outcome]).observe(seconds);
    }

    pub fn operations_total(&self, outcome: &str) -> u64 {
        self.operations.with_label_values(&[outcome]).get()
    }

    pub fn encode(&self) -> (StatusCode, String) {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("metrics encode error: {e}"),
            );
        }
        (
            StatusCode::OK,
            String::from_utf8(buffer).unwrap_or_default(),
        )
    }
}
