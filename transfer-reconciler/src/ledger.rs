//! Transfer ledger (reconciliation store)
//!
//! Owns one [`TransferRecord`] per transfer and folds incoming events into
//! it. Delivery is at-least-once and unordered, so every apply:
//!
//! - deduplicates by `event_id`
//! - validates the event against the current state (warnings only)
//! - advances state only when the event is not older than `last_updated`
//!
//! # Concurrency
//!
//! ```text
//! DashMap<transfer_id, Arc<Mutex<TransferRecord>>>
//!        │                      │
//!        │ shard lock:          │ record lock:
//!        │ lookup / create      │ held for the whole apply()
//!        ▼                      ▼
//!   different transfers    same transfer
//!   run in parallel        serialized
//! ```
//!
//! The shard lock is always released before a record lock is taken, and no
//! code path takes a shard lock while holding a record lock.

use crate::{
    metrics::Metrics,
    types::{TransferEvent, TransferRecord, Warning},
    validator::validate_transition,
};
use dashmap::{mapref::entry::Entry, DashMap};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Result of applying one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    /// Event was accepted (first delivery)
    pub processed: bool,

    /// Event was a redelivery and ignored
    pub duplicate: bool,

    /// Transfer the event belongs to
    pub transfer_id: String,

    /// Warnings raised by this event only
    pub warnings: Vec<Warning>,
}

impl ApplyOutcome {
    fn accepted(transfer_id: String, warnings: Vec<Warning>) -> Self {
        Self {
            processed: true,
            duplicate: false,
            transfer_id,
            warnings,
        }
    }

    fn duplicate(transfer_id: String) -> Self {
        Self {
            processed: false,
            duplicate: true,
            transfer_id,
            warnings: Vec::new(),
        }
    }
}

type RecordCell = Arc<Mutex<TransferRecord>>;

/// In-memory reconciliation store
#[derive(Default)]
pub struct TransferLedger {
    records: DashMap<String, RecordCell>,
    metrics: Option<Metrics>,
}

impl std::fmt::Debug for TransferLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferLedger")
            .field("transfers", &self.records.len())
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl TransferLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a metrics collector
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        metrics.set_transfers(self.records.len());
        self.metrics = Some(metrics);
        self
    }

    /// Attached metrics collector, if any
    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    /// Apply one event
    pub fn apply(&self, event: TransferEvent) -> ApplyOutcome {
        let started = Instant::now();
        let transfer_id = event.transfer_id.clone();

        let cell = match self.records.entry(transfer_id.clone()) {
            Entry::Vacant(vacant) => {
                // First event: nothing to validate against
                tracing::debug!(
                    transfer_id = %transfer_id,
                    event_id = %event.event_id,
                    status = %event.status,
                    "Transfer bootstrapped"
                );
                // Insert and release the shard lock before len() walks the shards
                drop(vacant.insert(Arc::new(Mutex::new(TransferRecord::seed(event)))));

                if let Some(metrics) = &self.metrics {
                    metrics.record_applied();
                    metrics.set_transfers(self.records.len());
                    metrics.record_apply_duration(started.elapsed().as_secs_f64());
                }
                return ApplyOutcome::accepted(transfer_id, Vec::new());
            }
            Entry::Occupied(occupied) => occupied.get().clone(),
        };

        let mut record = cell.lock();

        if record.has_seen(&event.event_id) {
            tracing::debug!(
                transfer_id = %transfer_id,
                event_id = %event.event_id,
                "Duplicate event ignored"
            );
            if let Some(metrics) = &self.metrics {
                metrics.record_duplicate();
            }
            return ApplyOutcome::duplicate(transfer_id);
        }

        record.seen_event_ids.insert(event.event_id.clone());

        let warnings = validate_transition(
            record.current_status,
            event.status,
            record.last_updated,
            event.timestamp,
            &event.event_id,
        );

        for warning in &warnings {
            tracing::warn!(
                transfer_id = %transfer_id,
                event_id = %warning.event_id,
                kind = %warning.kind,
                "{}",
                warning.message
            );
            if let Some(metrics) = &self.metrics {
                metrics.record_warning(warning.kind);
            }
        }
        record.warnings.extend(warnings.iter().cloned());

        // Warn but don't block: invalid transitions still advance state
        if event.timestamp >= record.last_updated {
            record.current_status = event.status;
            record.last_updated = event.timestamp;
            record.is_terminal = event.status.is_terminal();
        }

        tracing::debug!(
            transfer_id = %transfer_id,
            event_id = %event.event_id,
            current_status = %record.current_status,
            warnings = warnings.len(),
            "Event applied"
        );

        record.events.push(event);
        drop(record);

        if let Some(metrics) = &self.metrics {
            metrics.record_applied();
            metrics.record_apply_duration(started.elapsed().as_secs_f64());
        }

        ApplyOutcome::accepted(transfer_id, warnings)
    }

    /// Consistent copy of one record
    pub fn record(&self, transfer_id: &str) -> Option<TransferRecord> {
        let cell = self.records.get(transfer_id).map(|entry| entry.value().clone())?;
        let record = cell.lock().clone();
        Some(record)
    }

    /// Consistent copy of every record
    ///
    /// Each record is copied under its own lock, so no record is ever torn.
    /// Records are not captured at a single common instant.
    pub fn snapshot(&self) -> Vec<TransferRecord> {
        let cells: Vec<RecordCell> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        cells.iter().map(|cell| cell.lock().clone()).collect()
    }

    /// Replace all state with previously saved records
    pub fn restore(&self, records: Vec<TransferRecord>) {
        self.records.clear();
        for record in records {
            self.records
                .insert(record.transfer_id.clone(), Arc::new(Mutex::new(record)));
        }

        tracing::info!(transfers = self.records.len(), "Ledger restored");
        if let Some(metrics) = &self.metrics {
            metrics.set_transfers(self.records.len());
        }
    }

    /// Drop every record (test isolation)
    pub fn clear(&self) {
        self.records.clear();
        if let Some(metrics) = &self.metrics {
            metrics.set_transfers(0);
        }
    }

    /// Number of tracked transfers
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no transfer is tracked
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
