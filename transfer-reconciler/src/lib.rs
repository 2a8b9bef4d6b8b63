//! Transfer Reconciler
//!
//! Rebuilds the current state of financial transfers from an at-least-once,
//! out-of-order stream of status events, and records every anomaly it sees.
//!
//! # Architecture
//!
//! - **Transition table**: static `initiated → processing → settled|failed` lifecycle
//! - **Validator**: pure function from (current, incoming) to warnings
//! - **Ledger**: one record per transfer, per-record locking, idempotent apply
//! - **Query**: listing by recency and chronological detail views
//! - **Actors**: optional partitioned single-writer front end
//!
//! # Invariants
//!
//! - Redelivery of an `event_id` never changes a record
//! - The first event of a transfer is never validated
//! - Warnings are append-only and never block a state update
//! - A stale event (older than `last_updated`) never overwrites current state

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    clippy::all
)]

pub mod types;
pub mod transition;
pub mod validator;
pub mod ledger;
pub mod query;
pub mod intake;
pub mod storage;
pub mod actor;
pub mod error;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, Result};
pub use types::{TransferEvent, TransferRecord, TransferStatus, Warning, WarningKind};
pub use ledger::{ApplyOutcome, TransferLedger};
pub use query::{TransferDetail, TransferSummary};
pub use intake::{parse_event, IngestResponse};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use actor::{spawn_reconciler, ReconcilerHandle};
pub use config::Config;
pub use metrics::Metrics;
