//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("metagram_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");

    // Sync Metrics
    pub static ref SYNC_RUNS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("metagram_sync_runs_total", "Total number of drain sync runs"),
        &["domain", "status"]
    ).expect("metric can be created");
    pub static ref SWEEPS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("metagram_sweeps_total", "Total number of background sweeps"),
        &["domain"]
    ).expect("metric can be created");

    // Publishing Metrics
    pub static ref PUBLISH_ATTEMPTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("metagram_publish_attempts_total", "Total number of publish attempts"),
        &["status"]
    ).expect("metric can be created");
    pub static ref CONTAINER_WAIT_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "metagram_container_wait_seconds",
            "Time spent waiting for media containers to process"
        ).buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 150.0]),
        &["outcome"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("metagram_errors_total", "Total number of errors"),
        &["error_type", "endpoint"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("HTTP_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(SYNC_RUNS_TOTAL.clone()))
        .expect("SYNC_RUNS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(SWEEPS_TOTAL.clone()))
        .expect("SWEEPS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(PUBLISH_ATTEMPTS_TOTAL.clone()))
        .expect("PUBLISH_ATTEMPTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CONTAINER_WAIT_SECONDS.clone()))
        .expect("CONTAINER_WAIT_SECONDS can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
