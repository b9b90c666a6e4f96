//! Session states and the per-step diagnostic log.
//!
//! The step log is what lets a caller resume cleanly after a partial
//! failure: already-confirmed steps are visible, so a retry skips them
//! instead of duplicating work.

use royalty::Address;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    EnsureRegistered,
    MirrorContributors,
    Distribute,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepAction {
    ProbeDataset { ledger_id: u64 },
    RegisterDataset,
    MirrorContributor { address: Address },
    Distribute { amount: u64 },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Transaction submitted and confirmed.
    Confirmed,
    /// Probe found the record; nothing submitted.
    Found,
    /// Probe found nothing; registration will follow.
    Missing,
    /// Ledger already has this contributor; counts as mirrored, nothing
    /// submitted.
    AlreadyMirrored,
    /// The ledger's contributor configuration conflicts with ours; skipped,
    /// to be reconciled out of band.
    PercentageConflict,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncStep {
    #[serde(flatten)]
    pub action: StepAction,
    #[serde(flatten)]
    pub outcome: StepOutcome,
    /// Nonce consumed by this step, if a transaction was submitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    /// State the session was in when it failed.
    pub step: SessionState,
    pub message: String,
    /// Transactions actually broadcast before the failure. Zero means a
    /// retry is free of double-spend concerns.
    pub submitted_txs: u64,
}

/// Final account of one synchronization session.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub dataset_id: Uuid,
    pub state: SessionState,
    pub ledger_id: Option<u64>,
    pub starting_nonce: u64,
    pub consumed_nonces: u64,
    /// Contributors present on the ledger after the session (confirmed or
    /// already there).
    pub mirrored: Vec<Address>,
    /// Contributors skipped over a percentage conflict.
    pub skipped: Vec<Address>,
    pub steps: Vec<SyncStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<SyncFailure>,
}

impl SyncReport {
    pub fn is_confirmed(&self) -> bool {
        self.state == SessionState::Confirmed
    }
}
