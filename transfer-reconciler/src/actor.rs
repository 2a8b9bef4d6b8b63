//! Actor-based ingestion front end
//!
//! Routes every event of a transfer to the same partition actor, so one
//! task applies a transfer's events in arrival order while other partitions
//! proceed in parallel:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               ReconcilerHandle (Clone)                │
//! │     partition = blake3(transfer_id) % partitions      │
//! └───────┬──────────────────┬──────────────────┬────────┘
//!         │ mpsc (bounded)   │                  │
//!         ▼                  ▼                  ▼
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Partition 0  │   │ Partition 1  │   │ Partition N  │
//! └───────┬──────┘   └───────┬──────┘   └───────┬──────┘
//!         └──────────────────┼──────────────────┘
//!                            ▼
//!              TransferLedger (per-record locks)
//! ```
//!
//! Reads bypass the actors and go straight to the ledger, which hands out
//! per-record consistent copies.

use crate::{
    ledger::{ApplyOutcome, TransferLedger},
    query::{TransferDetail, TransferSummary},
    types::TransferEvent,
    Error, Result,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Message sent to a partition actor
#[derive(Debug)]
pub enum ReconcilerMessage {
    /// Apply one event
    Apply {
        /// Event to apply
        event: TransferEvent,
        /// Reply channel
        response: oneshot::Sender<ApplyOutcome>,
    },

    /// Stop after draining everything queued before this message
    Shutdown,
}

/// Actor owning one partition of the transfer key space
#[derive(Debug)]
pub struct PartitionActor {
    /// Partition index (for logs)
    partition: usize,

    /// Shared ledger
    ledger: Arc<TransferLedger>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<ReconcilerMessage>,
}

impl PartitionActor {
    /// Create new actor
    pub fn new(
        partition: usize,
        ledger: Arc<TransferLedger>,
        mailbox: mpsc::Receiver<ReconcilerMessage>,
    ) -> Self {
        Self {
            partition,
            ledger,
            mailbox,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        tracing::debug!(partition = self.partition, "Partition actor started");

        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                ReconcilerMessage::Apply { event, response } => {
                    let outcome = self.ledger.apply(event);
                    // Caller may have given up waiting; the event is applied regardless
                    let _ = response.send(outcome);
                }
                ReconcilerMessage::Shutdown => break,
            }
        }

        tracing::debug!(partition = self.partition, "Partition actor stopped");
    }
}

/// Handle for sending events to the partition actors
#[derive(Debug, Clone)]
pub struct ReconcilerHandle {
    senders: Arc<Vec<mpsc::Sender<ReconcilerMessage>>>,
    ledger: Arc<TransferLedger>,
}

impl ReconcilerHandle {
    /// Partition responsible for `transfer_id`
    pub fn partition_for(&self, transfer_id: &str) -> usize {
        partition_for(transfer_id, self.senders.len())
    }

    /// Number of partitions
    pub fn partitions(&self) -> usize {
        self.senders.len()
    }

    /// Apply an event through its partition actor
    pub async fn apply(&self, event: TransferEvent) -> Result<ApplyOutcome> {
        let sender = &self.senders[self.partition_for(&event.transfer_id)];

        let (tx, rx) = oneshot::channel();
        sender
            .send(ReconcilerMessage::Apply {
                event,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Summaries of every transfer, most recently updated first
    pub fn list_all(&self) -> Vec<TransferSummary> {
        self.ledger.list_all()
    }

    /// Detail view of one transfer
    pub fn get_detail(&self, transfer_id: &str) -> Option<TransferDetail> {
        self.ledger.get_detail(transfer_id)
    }

    /// Drop every record (test isolation)
    pub fn clear(&self) {
        self.ledger.clear();
    }

    /// Number of tracked transfers
    pub fn count(&self) -> usize {
        self.ledger.len()
    }

    /// Shared ledger
    pub fn ledger(&self) -> &Arc<TransferLedger> {
        &self.ledger
    }

    /// Ask every partition actor to stop
    pub async fn shutdown(&self) -> Result<()> {
        for sender in self.senders.iter() {
            sender
                .send(ReconcilerMessage::Shutdown)
                .await
                .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        }
        Ok(())
    }
}

/// Partition index for `transfer_id` among `partitions`
///
/// A partition count of zero is treated as one.
pub fn partition_for(transfer_id: &str, partitions: usize) -> usize {
    let partitions = partitions.max(1);
    let hash = blake3::hash(transfer_id.as_bytes());
    let bytes = hash.as_bytes();
    let hash_u64 = u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ]);
    (hash_u64 % partitions as u64) as usize
}

/// Spawn the partition actors
///
/// Returns the handle and the actor join handles, so callers can wait for
/// the mailboxes to drain after [`ReconcilerHandle::shutdown`].
pub fn spawn_reconciler(
    ledger: Arc<TransferLedger>,
    partitions: usize,
    mailbox_capacity: usize,
) -> (ReconcilerHandle, Vec<JoinHandle<()>>) {
    let partitions = partitions.max(1);
    let mut senders = Vec::with_capacity(partitions);
    let mut tasks = Vec::with_capacity(partitions);

    for partition in 0..partitions {
        let (tx, rx) = mpsc::channel(mailbox_capacity.max(1)); // Bounded channel for backpressure
        let actor = PartitionActor::new(partition, ledger.clone(), rx);
        tasks.push(tokio::spawn(actor.run()));
        senders.push(tx);
    }

    tracing::info!(partitions, mailbox_capacity, "Reconciler actors spawned");

    (
        ReconcilerHandle {
            senders: Arc::new(senders),
            ledger,
        },
        tasks,
    )
}
