//! Ledger synchronization for dataset royalties.
//!
//! Reconciles a dataset's locally-kept contributor shares with the on-chain
//! registry and executes the proportional distribution: lazy dataset
//! registration, idempotent contributor mirroring, then a single distribute
//! transaction. One session per dataset at a time; transactions are submitted
//! strictly in order with confirmation awaited between them.

mod ledger;
mod lock;
mod nonce;
mod session;
mod sync;

pub use ledger::{
    LedgerClient, LedgerDatasetRecord, LedgerError, LedgerEvent, LedgerResult, PendingTx, Receipt,
    RegisterDataset, RejectReason,
};
pub use lock::{SessionGuard, SessionLock};
pub use nonce::NonceSequencer;
pub use session::{SessionState, StepAction, StepOutcome, SyncFailure, SyncReport, SyncStep};
pub use sync::{SyncError, Synchronizer};
