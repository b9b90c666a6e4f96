//! Usage recording and the per-contributor reward split.

use std::collections::BTreeMap;

use chrono::Utc;

use crate::types::{Address, Contributor, Dataset, UsageEvent};
use crate::{Result, RoyaltyError};

/// Outcome of one recorded usage: the per-contributor snapshot plus how much
/// of the pool was actually assigned.
#[derive(Debug, Clone)]
pub struct RewardSplit {
    pub distribution: BTreeMap<Address, u64>,
    pub distributed: u64,
    /// Integer rounding loss. Not redistributed.
    pub remainder: u64,
}

/// Compute `floor(pool * percentage / 100)` per contributor, in integer
/// arithmetic so the split is deterministic and auditable. When percentages
/// do not divide the pool evenly the sum falls short of `reward_pool`; that
/// remainder stays with the pool and is not redistributed.
pub fn reward_split(reward_pool: u64, contributors: &[Contributor]) -> RewardSplit {
    let mut distribution = BTreeMap::new();
    let mut distributed: u64 = 0;
    for c in contributors {
        let reward = (reward_pool as u128 * c.percentage as u128 / 100) as u64;
        distribution.insert(c.address.clone(), reward);
        distributed += reward;
    }
    RewardSplit {
        distribution,
        distributed,
        remainder: reward_pool - distributed,
    }
}

impl Dataset {
    /// Record that a trainer produced a model against this dataset and book
    /// the per-contributor split for the event's reward pool.
    ///
    /// Pure local bookkeeping: never touches the ledger, and always succeeds
    /// once validation passes. The reward pool is added to `pending_pool`
    /// until a synchronization session distributes it on-chain.
    pub fn record_usage(
        &mut self,
        trainer: Address,
        model_type: impl Into<String>,
        accuracy_bps: u16,
        reward_pool: u64,
    ) -> Result<RewardSplit> {
        if accuracy_bps > 10_000 {
            return Err(RoyaltyError::InvalidAccuracy(accuracy_bps));
        }
        if reward_pool == 0 {
            return Err(RoyaltyError::EmptyRewardPool);
        }
        if self.contributors.is_empty() {
            return Err(RoyaltyError::NoContributors);
        }

        let split = reward_split(reward_pool, &self.contributors);

        // All-or-nothing: prove every counter fits before mutating any of
        // them, so a rejected event leaves the dataset untouched.
        let pending = self
            .pending_pool
            .checked_add(reward_pool)
            .ok_or(RoyaltyError::RewardOverflow)?;
        for c in &self.contributors {
            c.cumulative_reward
                .checked_add(split.distribution[&c.address])
                .ok_or(RoyaltyError::RewardOverflow)?;
        }

        for c in &mut self.contributors {
            c.cumulative_reward += split.distribution[&c.address];
        }
        self.pending_pool = pending;

        self.usage_events.push(UsageEvent {
            trainer,
            model_type: model_type.into(),
            accuracy_bps,
            reward_pool,
            timestamp: Utc::now(),
            reward_distribution: split.distribution.clone(),
        });

        Ok(split)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::parse(&format!("0x{:040x}", n)).unwrap()
    }

    fn contributors(shares: &[(u8, u8)]) -> Vec<Contributor> {
        shares
            .iter()
            .map(|&(n, pct)| Contributor {
                address: addr(n),
                percentage: pct,
                cumulative_reward: 0,
                joined_at: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn split_never_exceeds_pool() {
        let shapes: &[&[(u8, u8)]] = &[
            &[(1, 60), (2, 40)],
            &[(1, 33), (2, 33), (3, 34)],
            &[(1, 1), (2, 1), (3, 1)],
            &[(1, 99), (2, 1)],
        ];
        for shares in shapes {
            for pool in [1u64, 7, 10, 99, 100, 12345, u64::MAX / 2] {
                let cs = contributors(shares);
                let split = reward_split(pool, &cs);
                assert!(split.distributed <= pool);
                assert_eq!(split.distributed + split.remainder, pool);
            }
        }
    }

    #[test]
    fn rounding_down_loss_is_kept_not_redistributed() {
        let cs = contributors(&[(1, 33), (2, 33), (3, 34)]);
        let split = reward_split(10, &cs);
        assert_eq!(split.distribution[&addr(1)], 3);
        assert_eq!(split.distribution[&addr(2)], 3);
        assert_eq!(split.distribution[&addr(3)], 3);
        assert_eq!(split.distributed, 9);
        assert_eq!(split.remainder, 1);
    }

    #[test]
    fn large_pools_do_not_overflow() {
        let cs = contributors(&[(1, 100)]);
        let split = reward_split(u64::MAX, &cs);
        assert_eq!(split.distribution[&addr(1)], u64::MAX);
    }
}
