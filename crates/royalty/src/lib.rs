//! Dataset royalty bookkeeping.
//!
//! A dataset owner shares usage-based rewards with contributors according to
//! fixed percentage shares. Everything in this crate is local and synchronous;
//! reconciling the resulting state with the on-chain registry lives in the
//! `chainsync` crate.

mod contributors;
mod store;
mod types;
mod usage;

pub use store::{DatasetStore, InMemoryStore, JsonFileStore, StoreError};
pub use types::{Address, Contributor, Dataset, UsageEvent};
pub use usage::RewardSplit;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoyaltyError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("only the dataset owner may {0}")]
    Unauthorized(&'static str),

    #[error("contributor {0} already present")]
    DuplicateContributor(Address),

    #[error("contributor {0} not found")]
    ContributorNotFound(Address),

    #[error("percentage must be between 1 and 100, got {0}")]
    InvalidPercentage(u8),

    #[error("total percentage would exceed 100% (allocated: {allocated}%, adding: {requested}%)")]
    PercentageOverflow { allocated: u32, requested: u8 },

    #[error("the owner's royalty entry can be edited but not removed")]
    CannotRemoveOwner,

    #[error("accuracy must be between 0 and 10000, got {0}")]
    InvalidAccuracy(u16),

    #[error("reward pool must be greater than zero")]
    EmptyRewardPool,

    #[error("reward counters would overflow")]
    RewardOverflow,

    #[error("dataset has no royalty contributors")]
    NoContributors,
}

pub type Result<T> = std::result::Result<T, RoyaltyError>;
