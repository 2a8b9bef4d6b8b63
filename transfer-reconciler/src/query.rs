//! Read-only projections over the ledger

use crate::{
    ledger::TransferLedger,
    types::{TransferEvent, TransferRecord, TransferStatus, Warning},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the transfer listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSummary {
    /// Transfer ID
    pub id: String,

    /// Current status
    pub current_status: TransferStatus,

    /// Terminal flag
    pub is_terminal: bool,

    /// Timestamp of the event that set the current status
    pub last_updated: DateTime<Utc>,

    /// Number of warnings raised so far
    pub warning_count: usize,
}

impl From<&TransferRecord> for TransferSummary {
    fn from(record: &TransferRecord) -> Self {
        Self {
            id: record.transfer_id.clone(),
            current_status: record.current_status,
            is_terminal: record.is_terminal,
            last_updated: record.last_updated,
            warning_count: record.warnings.len(),
        }
    }
}

/// Full view of one transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDetail {
    /// Transfer ID
    pub id: String,

    /// Current status
    pub current_status: TransferStatus,

    /// Terminal flag
    pub is_terminal: bool,

    /// Timestamp of the event that set the current status
    pub last_updated: DateTime<Utc>,

    /// Every warning, in detection order
    pub warnings: Vec<Warning>,

    /// Every accepted event, ascending by event timestamp
    pub events: Vec<TransferEvent>,
}

impl From<TransferRecord> for TransferDetail {
    fn from(record: TransferRecord) -> Self {
        let mut events = record.events;
        // Stable: same-timestamp events keep arrival order
        events.sort_by_key(|event| event.timestamp);

        Self {
            id: record.transfer_id,
            current_status: record.current_status,
            is_terminal: record.is_terminal,
            last_updated: record.last_updated,
            warnings: record.warnings,
            events,
        }
    }
}

impl TransferLedger {
    /// Summaries of every transfer, most recently updated first
    pub fn list_all(&self) -> Vec<TransferSummary> {
        let mut summaries: Vec<TransferSummary> = self
            .snapshot()
            .iter()
            .map(TransferSummary::from)
            .collect();

        summaries.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        summaries
    }

    /// Detail view of one transfer, `None` if it was never seen
    pub fn get_detail(&self, transfer_id: &str) -> Option<TransferDetail> {
        self.record(transfer_id).map(TransferDetail::from)
    }
}
