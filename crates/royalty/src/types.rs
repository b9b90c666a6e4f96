use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::RoyaltyError;

/// Wallet address, normalized to lower case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Parse a `0x`-prefixed 20-byte hex address, normalizing case.
    pub fn parse(s: &str) -> Result<Self, RoyaltyError> {
        let s = s.trim();
        let hex_part = s
            .strip_prefix("0x")
            .ok_or_else(|| RoyaltyError::InvalidAddress(s.to_string()))?;
        if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(RoyaltyError::InvalidAddress(s.to_string()));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contributor {
    pub address: Address,
    /// Fixed royalty share, 1..=100.
    pub percentage: u8,
    /// Locally accumulated rewards. Provisional bookkeeping: once a ledger
    /// distribution has confirmed, the ledger's own totals are authoritative
    /// and this counter is an audit trail only.
    pub cumulative_reward: u64,
    pub joined_at: DateTime<Utc>,
}

/// One trainer-produced model against the dataset. Append-only; the
/// distribution snapshot is computed at record time and never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    pub trainer: Address,
    pub model_type: String,
    /// Model accuracy in hundredths of a percent (0..=10000).
    pub accuracy_bps: u16,
    pub reward_pool: u64,
    pub timestamp: DateTime<Utc>,
    pub reward_distribution: BTreeMap<Address, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub id: Uuid,
    pub name: String,
    pub owner: Address,
    /// Id assigned by the on-chain registry; `None` until registered.
    pub ledger_id: Option<u64>,
    pub contributors: Vec<Contributor>,
    pub usage_events: Vec<UsageEvent>,
    /// Total confirmed on the ledger across all past distributions.
    pub total_rewarded: u64,
    /// Reward pools recorded locally but not yet distributed on-chain.
    pub pending_pool: u64,
    pub created_at: DateTime<Utc>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, owner: Address) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            owner,
            ledger_id: None,
            contributors: Vec::new(),
            usage_events: Vec::new(),
            total_rewarded: 0,
            pending_pool: 0,
            created_at: Utc::now(),
        }
    }

    pub fn contributor(&self, address: &Address) -> Option<&Contributor> {
        self.contributors.iter().find(|c| &c.address == address)
    }

    /// Sum of all contributor percentages. Invariant: never exceeds 100.
    pub fn allocated_percentage(&self) -> u32 {
        self.contributors.iter().map(|c| c.percentage as u32).sum()
    }

    /// Saturates at zero: a persisted record that was hand-edited past 100%
    /// reads as fully allocated instead of panicking.
    pub fn remaining_percentage(&self) -> u32 {
        100u32.saturating_sub(self.allocated_percentage())
    }
}
