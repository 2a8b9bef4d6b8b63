//! Transfer status transition table
//!
//! The only valid lifecycle edges are:
//!
//! ```text
//! initiated ──► processing ──► settled
//!     │             │
//!     └────────┬────┘
//!              ▼
//!            failed
//! ```
//!
//! Terminal statuses have no outgoing edges, and a status never transitions
//! to itself.

use crate::types::TransferStatus;

impl TransferStatus {
    /// Check if transition is valid
    pub fn can_transition_to(&self, next: TransferStatus) -> bool {
        use TransferStatus::*;

        matches!(
            (self, next),
            | (Initiated, Processing)
            | (Initiated, Failed)
            | (Processing, Settled)
            | (Processing, Failed)
        )
    }

    /// Check if status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Settled | TransferStatus::Failed)
    }
}

/// Whether `status` is terminal
pub fn is_terminal(status: TransferStatus) -> bool {
    status.is_terminal()
}

/// Whether `from -> to` is an allowed transition
pub fn is_valid_transition(from: TransferStatus, to: TransferStatus) -> bool {
    from.can_transition_to(to)
}
