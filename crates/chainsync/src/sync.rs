//! The synchronization state machine:
//! `EnsureRegistered -> MirrorContributors -> Distribute -> Confirmed | Failed`.
//!
//! One RPC is in flight at a time and every submission's confirmation is
//! awaited before the next, because later steps depend on ledger-assigned
//! state (the registration id) and on strict in-order nonces. Nothing local
//! is mutated speculatively: `ledger_id` is persisted the moment its
//! registration confirms, reward totals only when the distribution confirms.

use royalty::{Address, Dataset, DatasetStore, StoreError};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::ledger::{LedgerClient, LedgerError, LedgerEvent, RegisterDataset, RejectReason};
use crate::lock::SessionLock;
use crate::nonce::NonceSequencer;
use crate::session::{
    SessionState, StepAction, StepOutcome, SyncFailure, SyncReport, SyncStep,
};

/// Rejected before any session work started; no ledger RPC was made.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("a synchronization session is already running for dataset {0}")]
    SessionBusy(Uuid),

    #[error("dataset {0} not found")]
    DatasetNotFound(Uuid),

    #[error("only the dataset owner may distribute")]
    Unauthorized,

    #[error("dataset has no royalty contributors")]
    NoContributors,

    #[error("allocation incomplete: {remaining}% of royalties unassigned")]
    IncompleteAllocation { remaining: u32 },

    #[error("no recorded usage awaiting distribution")]
    NothingToDistribute,

    #[error("distribution would overflow the dataset's reward counters")]
    RewardOverflow,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
enum SessionError {
    #[error("registration confirmed but no dataset id could be extracted from the event log")]
    RegistrationIdMissing,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

struct SessionCtx {
    seq: NonceSequencer,
    state: SessionState,
    ledger_id: Option<u64>,
    steps: Vec<SyncStep>,
    mirrored: Vec<Address>,
    skipped: Vec<Address>,
}

impl SessionCtx {
    fn new(ledger_id: Option<u64>) -> Self {
        Self {
            seq: NonceSequencer::new(0),
            state: SessionState::EnsureRegistered,
            ledger_id,
            steps: Vec::new(),
            mirrored: Vec::new(),
            skipped: Vec::new(),
        }
    }

    fn push(
        &mut self,
        action: StepAction,
        outcome: StepOutcome,
        nonce: Option<u64>,
        tx_hash: Option<String>,
    ) {
        self.steps.push(SyncStep {
            action,
            outcome,
            nonce,
            tx_hash,
        });
    }

    /// Log the failing step before aborting, so the report shows where the
    /// session stopped and whether a transaction went out for that step.
    fn fail(
        &mut self,
        action: StepAction,
        error: impl ToString,
        nonce: Option<u64>,
        tx_hash: Option<String>,
    ) {
        self.push(
            action,
            StepOutcome::Failed {
                error: error.to_string(),
            },
            nonce,
            tx_hash,
        );
    }
}

pub struct Synchronizer<L, S> {
    ledger: L,
    store: S,
    lock: SessionLock,
}

impl<L: LedgerClient, S: DatasetStore> Synchronizer<L, S> {
    pub fn new(ledger: L, store: S) -> Self {
        Self {
            ledger,
            store,
            lock: SessionLock::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// The per-dataset lock. Contributor-list mutations must hold it too, so
    /// a running session never observes a half-applied contributor set.
    pub fn lock(&self) -> &SessionLock {
        &self.lock
    }

    /// Run one end-to-end synchronization session for a dataset and execute
    /// the proportional distribution of its pending reward pool.
    ///
    /// Precondition failures return `Err` before any ledger RPC. A session
    /// that started always yields a report; on failure it records the failing
    /// step and how many transactions were actually broadcast, so a retry can
    /// resume instead of duplicating work.
    pub async fn distribute(
        &self,
        dataset_id: Uuid,
        requester: &Address,
    ) -> Result<SyncReport, SyncError> {
        let _guard = self
            .lock
            .try_acquire(dataset_id)
            .ok_or(SyncError::SessionBusy(dataset_id))?;

        let mut dataset = self
            .store
            .load(dataset_id)?
            .ok_or(SyncError::DatasetNotFound(dataset_id))?;

        if requester != &dataset.owner {
            return Err(SyncError::Unauthorized);
        }
        if dataset.contributors.is_empty() {
            return Err(SyncError::NoContributors);
        }
        if dataset.allocated_percentage() != 100 {
            return Err(SyncError::IncompleteAllocation {
                remaining: dataset.remaining_percentage(),
            });
        }
        let amount = dataset.pending_pool;
        if amount == 0 {
            return Err(SyncError::NothingToDistribute);
        }
        // Checked here, while the lock keeps pending_pool stable, so the
        // distribute transaction is never broadcast when its local
        // bookkeeping could not be recorded.
        if dataset.total_rewarded.checked_add(amount).is_none() {
            return Err(SyncError::RewardOverflow);
        }

        info!(dataset_id = %dataset_id, amount, "chainsync: session started");

        let mut ctx = SessionCtx::new(dataset.ledger_id);
        let outcome = self.run_session(&mut dataset, amount, &mut ctx).await;

        let report = match outcome {
            Ok(()) => {
                info!(
                    dataset_id = %dataset_id,
                    ledger_id = ?ctx.ledger_id,
                    submitted = ctx.seq.consumed(),
                    "chainsync: session confirmed"
                );
                SyncReport {
                    dataset_id,
                    state: SessionState::Confirmed,
                    ledger_id: ctx.ledger_id,
                    starting_nonce: ctx.seq.starting(),
                    consumed_nonces: ctx.seq.consumed(),
                    mirrored: ctx.mirrored,
                    skipped: ctx.skipped,
                    steps: ctx.steps,
                    failure: None,
                }
            }
            Err(err) => {
                warn!(
                    dataset_id = %dataset_id,
                    step = ?ctx.state,
                    submitted = ctx.seq.consumed(),
                    "chainsync: session failed: {err}"
                );
                SyncReport {
                    dataset_id,
                    state: SessionState::Failed,
                    ledger_id: ctx.ledger_id,
                    starting_nonce: ctx.seq.starting(),
                    consumed_nonces: ctx.seq.consumed(),
                    mirrored: ctx.mirrored,
                    skipped: ctx.skipped,
                    steps: ctx.steps,
                    failure: Some(SyncFailure {
                        step: ctx.state,
                        message: err.to_string(),
                        submitted_txs: ctx.seq.consumed(),
                    }),
                }
            }
        };
        Ok(report)
    }

    async fn run_session(
        &self,
        dataset: &mut Dataset,
        amount: u64,
        ctx: &mut SessionCtx,
    ) -> Result<(), SessionError> {
        ctx.state = SessionState::EnsureRegistered;

        // One nonce query per session; a stale local count from a previous
        // timed-out session must never be reused.
        let starting = self.ledger.transaction_count(&dataset.owner).await?;
        ctx.seq = NonceSequencer::new(starting);

        let ledger_id = match dataset.ledger_id {
            Some(lid) => {
                let record = match self.ledger.dataset_record(lid).await {
                    Ok(r) => r,
                    Err(e) => {
                        ctx.fail(StepAction::ProbeDataset { ledger_id: lid }, &e, None, None);
                        return Err(e.into());
                    }
                };
                if record.is_some() {
                    ctx.push(
                        StepAction::ProbeDataset { ledger_id: lid },
                        StepOutcome::Found,
                        None,
                        None,
                    );
                    lid
                } else {
                    // Stale local id (ledger reset or wrong chain): register
                    // afresh rather than submitting against a dead record.
                    ctx.push(
                        StepAction::ProbeDataset { ledger_id: lid },
                        StepOutcome::Missing,
                        None,
                        None,
                    );
                    self.register(dataset, ctx).await?
                }
            }
            None => self.register(dataset, ctx).await?,
        };
        ctx.ledger_id = Some(ledger_id);

        ctx.state = SessionState::MirrorContributors;
        let shares: Vec<(Address, u8)> = dataset
            .contributors
            .iter()
            .map(|c| (c.address.clone(), c.percentage))
            .collect();
        for (address, percentage) in shares {
            let nonce = ctx.seq.peek();
            match self
                .ledger
                .submit_add_contributor(ledger_id, &address, percentage, nonce)
                .await
            {
                Ok(pending) => {
                    ctx.seq.advance();
                    let receipt = match self.ledger.await_confirmation(&pending).await {
                        Ok(r) => r,
                        Err(e) => {
                            ctx.fail(
                                StepAction::MirrorContributor { address },
                                &e,
                                Some(nonce),
                                Some(pending.hash),
                            );
                            return Err(e.into());
                        }
                    };
                    ctx.push(
                        StepAction::MirrorContributor {
                            address: address.clone(),
                        },
                        StepOutcome::Confirmed,
                        Some(nonce),
                        Some(receipt.tx_hash),
                    );
                    ctx.mirrored.push(address);
                }
                Err(LedgerError::Rejected(RejectReason::ContributorExists)) => {
                    // Already on the ledger: counts as mirrored, and since
                    // nothing was broadcast the nonce stays unconsumed.
                    ctx.push(
                        StepAction::MirrorContributor {
                            address: address.clone(),
                        },
                        StepOutcome::AlreadyMirrored,
                        None,
                        None,
                    );
                    ctx.mirrored.push(address);
                }
                Err(LedgerError::Rejected(RejectReason::PercentageOverflow)) => {
                    // The chain holds an older contributor configuration for
                    // this dataset. Recoverable: the owner reconciles out of
                    // band, the session keeps going.
                    warn!(
                        contributor = %address,
                        ledger_id,
                        "chainsync: percentage conflict, skipping contributor"
                    );
                    ctx.push(
                        StepAction::MirrorContributor {
                            address: address.clone(),
                        },
                        StepOutcome::PercentageConflict,
                        None,
                        None,
                    );
                    ctx.skipped.push(address);
                }
                Err(e) => {
                    ctx.fail(StepAction::MirrorContributor { address }, &e, None, None);
                    return Err(e.into());
                }
            }
        }

        ctx.state = SessionState::Distribute;
        let nonce = ctx.seq.peek();
        let pending = match self.ledger.submit_distribute(ledger_id, amount, nonce).await {
            Ok(p) => p,
            Err(e) => {
                ctx.fail(StepAction::Distribute { amount }, &e, None, None);
                return Err(e.into());
            }
        };
        ctx.seq.advance();
        let receipt = match self.ledger.await_confirmation(&pending).await {
            Ok(r) => r,
            Err(e) => {
                ctx.fail(
                    StepAction::Distribute { amount },
                    &e,
                    Some(nonce),
                    Some(pending.hash),
                );
                return Err(e.into());
            }
        };
        ctx.push(
            StepAction::Distribute { amount },
            StepOutcome::Confirmed,
            Some(nonce),
            Some(receipt.tx_hash),
        );

        // The ledger's per-contributor totals are authoritative from here;
        // the local cumulative counters remain as an audit trail.
        dataset.total_rewarded += amount;
        dataset.pending_pool = 0;
        self.store.save(dataset)?;
        ctx.state = SessionState::Confirmed;
        Ok(())
    }

    async fn register(
        &self,
        dataset: &mut Dataset,
        ctx: &mut SessionCtx,
    ) -> Result<u64, SessionError> {
        let req = RegisterDataset {
            name: dataset.name.clone(),
            owner: dataset.owner.clone(),
        };
        let nonce = ctx.seq.peek();
        let pending = match self.ledger.submit_register_dataset(&req, nonce).await {
            Ok(p) => p,
            Err(e) => {
                ctx.fail(StepAction::RegisterDataset, &e, None, None);
                return Err(e.into());
            }
        };
        ctx.seq.advance();
        let receipt = match self.ledger.await_confirmation(&pending).await {
            Ok(r) => r,
            Err(e) => {
                ctx.fail(StepAction::RegisterDataset, &e, Some(nonce), Some(pending.hash));
                return Err(e.into());
            }
        };

        let ledger_id = match receipt.events.iter().find_map(|e| match e {
            LedgerEvent::DatasetRegistered { ledger_id } => Some(*ledger_id),
            _ => None,
        }) {
            Some(id) => id,
            None => {
                // The registration did confirm; the report must show that a
                // transaction went out even though the id never arrived.
                let err = SessionError::RegistrationIdMissing;
                ctx.fail(
                    StepAction::RegisterDataset,
                    &err,
                    Some(nonce),
                    Some(receipt.tx_hash),
                );
                return Err(err);
            }
        };

        ctx.push(
            StepAction::RegisterDataset,
            StepOutcome::Confirmed,
            Some(nonce),
            Some(receipt.tx_hash),
        );

        // Persist immediately: the registration is on-chain, and a retry
        // after a later failure must not register twice.
        dataset.ledger_id = Some(ledger_id);
        self.store.save(dataset)?;
        info!(dataset_id = %dataset.id, ledger_id, "chainsync: dataset registered");
        Ok(ledger_id)
    }
}
