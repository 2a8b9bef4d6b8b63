//! Core types for the reconciler
//!
//! All types are designed for:
//! - Stable JSON rendering (lowercase / snake_case tags)
//! - Snapshotting through serde (bincode for the file store)
//! - Immutability of facts: events and warnings are never edited in place

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Transfer status asserted by an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    /// Transfer created
    Initiated,
    /// Transfer in flight
    Processing,
    /// Funds delivered (terminal)
    Settled,
    /// Transfer failed (terminal)
    Failed,
}

impl TransferStatus {
    /// All statuses, in lifecycle order
    pub const ALL: [TransferStatus; 4] = [
        TransferStatus::Initiated,
        TransferStatus::Processing,
        TransferStatus::Settled,
        TransferStatus::Failed,
    ];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Initiated => "initiated",
            TransferStatus::Processing => "processing",
            TransferStatus::Settled => "settled",
            TransferStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "initiated" => Ok(TransferStatus::Initiated),
            "processing" => Ok(TransferStatus::Processing),
            "settled" => Ok(TransferStatus::Settled),
            "failed" => Ok(TransferStatus::Failed),
            other => Err(crate::Error::InvalidStatus(other.to_string())),
        }
    }
}

/// One delivery of a status-change fact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    /// Transfer this event belongs to
    pub transfer_id: String,

    /// Delivery identifier (deduplication key)
    pub event_id: String,

    /// Status asserted by the event
    pub status: TransferStatus,

    /// When the status change happened (not when it arrived)
    pub timestamp: DateTime<Utc>,

    /// Optional free-text reason
    #[serde(default)]
    pub reason: Option<String>,
}

impl TransferEvent {
    /// Create an event without a reason
    pub fn new(
        transfer_id: impl Into<String>,
        event_id: impl Into<String>,
        status: TransferStatus,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            transfer_id: transfer_id.into(),
            event_id: event_id.into(),
            status,
            timestamp,
            reason: None,
        }
    }

    /// Attach a reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Anomaly classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Transition not allowed by the status table
    MissingTransition,
    /// Two different terminal outcomes for the same transfer
    ConflictingTerminal,
    /// Event older than the transfer's current state
    OutOfOrder,
}

impl WarningKind {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::MissingTransition => "missing_transition",
            WarningKind::ConflictingTerminal => "conflicting_terminal",
            WarningKind::OutOfOrder => "out_of_order",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic attached permanently to a transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// Anomaly type
    #[serde(rename = "type")]
    pub kind: WarningKind,

    /// Human-readable description
    pub message: String,

    /// Event that triggered detection
    pub event_id: String,

    /// Wall-clock time of detection
    pub detected_at: DateTime<Utc>,
}

/// Reconciled state of one transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Transfer ID
    pub transfer_id: String,

    /// Best-known status
    pub current_status: TransferStatus,

    /// Whether `current_status` is terminal
    pub is_terminal: bool,

    /// Timestamp of the event that last advanced `current_status`
    pub last_updated: DateTime<Utc>,

    /// Accepted events in arrival order
    pub events: Vec<TransferEvent>,

    /// Every warning ever raised, in detection order
    pub warnings: Vec<Warning>,

    /// Every event ID ever accepted. Never evicted.
    pub seen_event_ids: HashSet<String>,
}

impl TransferRecord {
    /// Bootstrap a record from the first event of a transfer
    pub fn seed(event: TransferEvent) -> Self {
        let mut seen_event_ids = HashSet::new();
        seen_event_ids.insert(event.event_id.clone());

        Self {
            transfer_id: event.transfer_id.clone(),
            current_status: event.status,
            is_terminal: event.status.is_terminal(),
            last_updated: event.timestamp,
            events: vec![event],
            warnings: Vec::new(),
            seen_event_ids,
        }
    }

    /// Whether this delivery was already accepted
    pub fn has_seen(&self, event_id: &str) -> bool {
        self.seen_event_ids.contains(event_id)
    }
}
