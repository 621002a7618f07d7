//! Bid increment policy
//!
//! A step function over the current highest bid. The breakpoints live
//! in a table so the policy can be swapped via configuration.
use crate::auction::Amount;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bids strictly below `below` move up by `step`; `None` is unbounded
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub below: Option<Amount>,
    pub step: Amount,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TierError {
    #[error("increment table is empty")]
    Empty,
    #[error("tier {0} has a zero step")]
    ZeroStep(usize),
    #[error("tier {0} breakpoint is not above the previous one")]
    NotIncreasing(usize),
    #[error("tier {0} is unbounded but not the last one")]
    UnboundedNotLast(usize),
    #[error("last tier must be unbounded")]
    MissingUnboundedTier,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Tier>", into = "Vec<Tier>")]
pub struct IncrementPolicy {
    tiers: Vec<Tier>,
}

impl IncrementPolicy {
    pub fn new(tiers: Vec<Tier>) -> Result<Self, TierError> {
        if tiers.is_empty() {
            return Err(TierError::Empty);
        }
        let last = tiers.len() - 1;
        let mut previous: Option<Amount> = None;
        for (i, tier) in tiers.iter().enumerate() {
            if tier.step == 0 {
                return Err(TierError::ZeroStep(i));
            }
            match tier.below {
                None if i != last => return Err(TierError::UnboundedNotLast(i)),
                None => {}
                Some(_) if i == last => return Err(TierError::MissingUnboundedTier),
                Some(below) => {
                    if previous.map(|p| below <= p).unwrap_or(false) {
                        return Err(TierError::NotIncreasing(i));
                    }
                    previous = Some(below);
                }
            }
        }
        Ok(Self { tiers })
    }

    /// Increment applied on top of `current`
    pub fn step_at(&self, current: Amount) -> Amount {
        self.tiers
            .iter()
            .find(|tier| tier.below.map(|below| current < below).unwrap_or(true))
            .map(|tier| tier.step)
            // construction guarantees an unbounded last tier
            .unwrap_or_else(|| self.tiers[self.tiers.len() - 1].step)
    }

    /// Smallest legal bid given the current highest one
    ///
    /// With no bid yet, that is the reserve price itself.
    pub fn minimum_next_bid(&self, current: Option<Amount>, reserve: Amount) -> Amount {
        match current {
            None => reserve,
            Some(current) => current.saturating_add(self.step_at(current)),
        }
    }
}

impl Default for IncrementPolicy {
    fn default() -> Self {
        Self {
            tiers: vec![
                Tier {
                    below: Some(5_000),
                    step: 10,
                },
                Tier {
                    below: Some(10_000),
                    step: 20,
                },
                Tier {
                    below: None,
                    step: 50,
                },
            ],
        }
    }
}

impl TryFrom<Vec<Tier>> for IncrementPolicy {
    type Error = TierError;

    fn try_from(tiers: Vec<Tier>) -> Result<Self, Self::Error> {
        Self::new(tiers)
    }
}

impl From<IncrementPolicy> for Vec<Tier> {
    fn from(policy: IncrementPolicy) -> Self {
        policy.tiers
    }
}
