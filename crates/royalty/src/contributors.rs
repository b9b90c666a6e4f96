//! Owner-authorized mutations of a dataset's contributor list.
//!
//! All three mutations preserve the allocation invariant
//! `sum(percentage) <= 100` and reject rather than clamp. Callers are
//! expected to hold the dataset's session lock so no synchronization
//! session observes a half-applied contributor set.

use chrono::Utc;

use crate::types::{Address, Contributor, Dataset};
use crate::{Result, RoyaltyError};

impl Dataset {
    pub fn add_contributor(
        &mut self,
        address: Address,
        percentage: u8,
        requester: &Address,
    ) -> Result<()> {
        if requester != &self.owner {
            return Err(RoyaltyError::Unauthorized("add contributors"));
        }
        if percentage < 1 || percentage > 100 {
            return Err(RoyaltyError::InvalidPercentage(percentage));
        }
        if self.contributor(&address).is_some() {
            return Err(RoyaltyError::DuplicateContributor(address));
        }
        let allocated = self.allocated_percentage();
        if allocated + percentage as u32 > 100 {
            return Err(RoyaltyError::PercentageOverflow {
                allocated,
                requested: percentage,
            });
        }

        self.contributors.push(Contributor {
            address,
            percentage,
            cumulative_reward: 0,
            joined_at: Utc::now(),
        });
        Ok(())
    }

    /// Change one contributor's share. The 100% total is re-validated against
    /// the *other* contributors, so an update can never break the invariant
    /// that `add_contributor` established.
    pub fn update_contributor_percentage(
        &mut self,
        address: &Address,
        new_percentage: u8,
        requester: &Address,
    ) -> Result<()> {
        if requester != &self.owner {
            return Err(RoyaltyError::Unauthorized("update contributors"));
        }
        if new_percentage < 1 || new_percentage > 100 {
            return Err(RoyaltyError::InvalidPercentage(new_percentage));
        }
        let others: u32 = self
            .contributors
            .iter()
            .filter(|c| &c.address != address)
            .map(|c| c.percentage as u32)
            .sum();
        if others + new_percentage as u32 > 100 {
            return Err(RoyaltyError::PercentageOverflow {
                allocated: others,
                requested: new_percentage,
            });
        }

        let entry = self
            .contributors
            .iter_mut()
            .find(|c| &c.address == address)
            .ok_or_else(|| RoyaltyError::ContributorNotFound(address.clone()))?;
        entry.percentage = new_percentage;
        Ok(())
    }

    /// Remove a contributor. The owner's own royalty entry, if present, is
    /// editable but never removable.
    pub fn remove_contributor(&mut self, address: &Address, requester: &Address) -> Result<()> {
        if requester != &self.owner {
            return Err(RoyaltyError::Unauthorized("remove contributors"));
        }
        if address == &self.owner && self.contributor(address).is_some() {
            return Err(RoyaltyError::CannotRemoveOwner);
        }
        let before = self.contributors.len();
        self.contributors.retain(|c| &c.address != address);
        if self.contributors.len() == before {
            return Err(RoyaltyError::ContributorNotFound(address.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::parse(&format!("0x{:040x}", n)).unwrap()
    }

    #[test]
    fn update_revalidates_total_against_others() {
        let owner = addr(1);
        let mut ds = Dataset::new("d", owner.clone());
        ds.add_contributor(addr(2), 60, &owner).unwrap();
        ds.add_contributor(addr(3), 30, &owner).unwrap();

        // 60 + 50 would exceed 100
        let err = ds
            .update_contributor_percentage(&addr(3), 50, &owner)
            .unwrap_err();
        assert!(matches!(err, RoyaltyError::PercentageOverflow { .. }));
        assert_eq!(ds.contributor(&addr(3)).unwrap().percentage, 30);

        ds.update_contributor_percentage(&addr(3), 40, &owner).unwrap();
        assert_eq!(ds.allocated_percentage(), 100);
    }

    #[test]
    fn owner_entry_is_editable_but_not_removable() {
        let owner = addr(1);
        let mut ds = Dataset::new("d", owner.clone());
        ds.add_contributor(owner.clone(), 70, &owner).unwrap();

        ds.update_contributor_percentage(&owner, 50, &owner).unwrap();
        assert_eq!(
            ds.remove_contributor(&owner, &owner).unwrap_err(),
            RoyaltyError::CannotRemoveOwner
        );
        assert_eq!(ds.contributors.len(), 1);
    }
}
