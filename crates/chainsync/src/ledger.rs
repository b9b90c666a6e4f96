//! The ledger client seam.
//!
//! The synchronizer only ever talks to the chain through this trait; the
//! gateway provides an HTTP implementation and tests provide an in-memory
//! one. Submission and confirmation are separate calls because the nonce
//! discipline depends on knowing whether a transaction was actually
//! broadcast.

use std::fmt;

use async_trait::async_trait;
use royalty::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why the ledger refused a submission before broadcasting it. No transaction
/// was sent and no nonce was consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    ContributorExists,
    PercentageOverflow,
    Other(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::ContributorExists => f.write_str("contributor already exists"),
            RejectReason::PercentageOverflow => {
                f.write_str("total percentage would exceed 100%")
            }
            RejectReason::Other(msg) => f.write_str(msg),
        }
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Transport or node failure; nothing is known about submission state.
    #[error("ledger rpc failed: {0}")]
    Rpc(String),

    /// Refused before broadcast; no nonce consumed.
    #[error("submission rejected: {0}")]
    Rejected(RejectReason),

    /// The transaction landed on-chain and failed.
    #[error("transaction reverted: {0}")]
    Reverted(String),

    /// No confirmation within the bounded wait. The transaction may still
    /// land later, so the local nonce view is unreliable from here on.
    #[error("confirmation timed out")]
    ConfirmationTimeout,
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// A broadcast, not-yet-confirmed transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTx {
    pub hash: String,
    pub nonce: u64,
}

/// Decoded entries from a confirmed transaction's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    DatasetRegistered { ledger_id: u64 },
    ContributorAdded { ledger_id: u64, address: Address },
    RoyaltiesDistributed { ledger_id: u64, amount: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: String,
    pub block: u64,
    pub events: Vec<LedgerEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDataset {
    pub name: String,
    pub owner: Address,
}

/// The registry's view of a dataset, as returned by a probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerDatasetRecord {
    pub ledger_id: u64,
    pub owner: Address,
    pub total_percentage: u32,
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current transaction count for a signer; the nonce its next
    /// transaction must carry.
    async fn transaction_count(&self, signer: &Address) -> LedgerResult<u64>;

    /// Probe for a dataset record. `Ok(None)` means the id is unknown to the
    /// ledger (stale local id, or the chain was reset).
    async fn dataset_record(&self, ledger_id: u64) -> LedgerResult<Option<LedgerDatasetRecord>>;

    async fn submit_register_dataset(
        &self,
        req: &RegisterDataset,
        nonce: u64,
    ) -> LedgerResult<PendingTx>;

    async fn submit_add_contributor(
        &self,
        ledger_id: u64,
        contributor: &Address,
        percentage: u8,
        nonce: u64,
    ) -> LedgerResult<PendingTx>;

    async fn submit_distribute(
        &self,
        ledger_id: u64,
        amount: u64,
        nonce: u64,
    ) -> LedgerResult<PendingTx>;

    /// Wait (bounded) for a broadcast transaction to confirm.
    async fn await_confirmation(&self, tx: &PendingTx) -> LedgerResult<Receipt>;
}
