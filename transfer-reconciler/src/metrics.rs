//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring reconciliation.
//!
//! # Metrics
//!
//! - `reconciler_events_applied_total` - Events accepted (new deliveries)
//! - `reconciler_events_duplicate_total` - Redeliveries ignored
//! - `reconciler_warnings_total{kind}` - Anomalies raised, by warning type
//! - `reconciler_transfers` - Transfers currently tracked
//! - `reconciler_apply_duration_seconds` - Histogram of apply latencies

use crate::types::WarningKind;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Accepted events
    pub events_applied: IntCounter,

    /// Duplicate deliveries
    pub events_duplicate: IntCounter,

    /// Warnings by kind
    pub warnings: IntCounterVec,

    /// Tracked transfers
    pub transfers: IntGauge,

    /// Apply duration histogram
    pub apply_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("events_applied", &self.events_applied.get())
            .field("events_duplicate", &self.events_duplicate.get())
            .field("transfers", &self.transfers.get())
            .finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector on a private registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let events_applied = IntCounter::new(
            "reconciler_events_applied_total",
            "Total number of events accepted",
        )?;
        registry.register(Box::new(events_applied.clone()))?;

        let events_duplicate = IntCounter::new(
            "reconciler_events_duplicate_total",
            "Total number of duplicate deliveries ignored",
        )?;
        registry.register(Box::new(events_duplicate.clone()))?;

        let warnings = IntCounterVec::new(
            Opts::new("reconciler_warnings_total", "Total number of warnings raised"),
            &["kind"],
        )?;
        registry.register(Box::new(warnings.clone()))?;

        let transfers = IntGauge::new("reconciler_transfers", "Number of tracked transfers")?;
        registry.register(Box::new(transfers.clone()))?;

        let apply_duration = Histogram::with_opts(
            HistogramOpts::new(
                "reconciler_apply_duration_seconds",
                "Histogram of apply latencies",
            )
            .buckets(vec![0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01]),
        )?;
        registry.register(Box::new(apply_duration.clone()))?;

        Ok(Self {
            events_applied,
            events_duplicate,
            warnings,
            transfers,
            apply_duration,
            registry,
        })
    }

    /// Record accepted event
    pub fn record_applied(&self) {
        self.events_applied.inc();
    }

    /// Record duplicate delivery
    pub fn record_duplicate(&self) {
        self.events_duplicate.inc();
    }

    /// Record a warning
    pub fn record_warning(&self, kind: WarningKind) {
        self.warnings.with_label_values(&[kind.as_str()]).inc();
    }

    /// Warnings recorded for `kind`
    pub fn warning_count(&self, kind: WarningKind) -> u64 {
        self.warnings.with_label_values(&[kind.as_str()]).get()
    }

    /// Update tracked transfer count
    pub fn set_transfers(&self, count: usize) {
        self.transfers.set(count as i64);
    }

    /// Record apply duration
    pub fn record_apply_duration(&self, duration_seconds: f64) {
        self.apply_duration.observe(duration_seconds);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text format
    pub fn gather_text(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
