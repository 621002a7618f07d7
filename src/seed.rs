//! Initial catalog and roster
//!
//! Loaders only produce data; `Seed::validate` is the single gate
//! every seed passes before an auction can start.
pub mod json;
pub mod postgres;

pub use self::{json::*, postgres::*};
use crate::auction::{Amount, BidderId, ItemId, LotId};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeedError {
    #[error("catalog has no lots")]
    NoLots,
    #[error("roster has no bidders")]
    NoBidders,
    #[error("duplicate lot: {0}")]
    DuplicateLot(LotId),
    #[error("duplicate item: {0}")]
    DuplicateItem(ItemId),
    #[error("duplicate bidder: {0}")]
    DuplicateBidder(BidderId),
    #[error("item {item} claims lot {claimed} but is listed under {lot}")]
    LotMismatch {
        item: ItemId,
        lot: LotId,
        claimed: LotId,
    },
    #[error("bidder {0} has no starting budget")]
    NoBudget(BidderId),
    #[error("bidder {bidder} retains {cost} worth of items on a budget of {budget}")]
    RetentionOverBudget {
        bidder: BidderId,
        cost: Amount,
        budget: Amount,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSeed {
    pub id: ItemId,
    /// Optional on input; must match the enclosing lot when present
    #[serde(default)]
    pub lot: Option<LotId>,
    pub reserve: Amount,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotSeed {
    pub id: LotId,
    pub items: Vec<ItemSeed>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidderSeed {
    pub id: BidderId,
    pub starting_budget: Amount,
    /// Items kept from before the auction; never auctioned, paid from the budget
    #[serde(default)]
    pub retained: Vec<RetainedSeed>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetainedSeed {
    pub item: ItemId,
    pub amount: Amount,
}

impl BidderSeed {
    pub fn retained_cost(&self) -> Amount {
        self.retained
            .iter()
            .fold(0, |cost: Amount, r| cost.saturating_add(r.amount))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seed {
    pub lots: Vec<LotSeed>,
    pub bidders: Vec<BidderSeed>,
}

impl Seed {
    pub fn validate(&self) -> Result<(), SeedError> {
        if self.lots.is_empty() {
            return Err(SeedError::NoLots);
        }
        if self.bidders.is_empty() {
            return Err(SeedError::NoBidders);
        }

        let mut lots = BTreeSet::new();
        let mut items = BTreeSet::new();
        for lot in &self.lots {
            if !lots.insert(lot.id.as_str()) {
                return Err(SeedError::DuplicateLot(lot.id.clone()));
            }
            for item in &lot.items {
                if !items.insert(item.id.as_str()) {
                    return Err(SeedError::DuplicateItem(item.id.clone()));
                }
                if let Some(claimed) = &item.lot {
                    if claimed != &lot.id {
                        return Err(SeedError::LotMismatch {
                            item: item.id.clone(),
                            lot: lot.id.clone(),
                            claimed: claimed.clone(),
                        });
                    }
                }
            }
        }

        let mut bidders = BTreeSet::new();
        for bidder in &self.bidders {
            if !bidders.insert(bidder.id.as_str()) {
                return Err(SeedError::DuplicateBidder(bidder.id.clone()));
            }
            if bidder.starting_budget == 0 {
                return Err(SeedError::NoBudget(bidder.id.clone()));
            }
            for retained in &bidder.retained {
                if !items.insert(retained.item.as_str()) {
                    return Err(SeedError::DuplicateItem(retained.item.clone()));
                }
            }
            let cost = bidder.retained_cost();
            if cost > bidder.starting_budget {
                return Err(SeedError::RetentionOverBudget {
                    bidder: bidder.id.clone(),
                    cost,
                    budget: bidder.starting_budget,
                });
            }
        }
        Ok(())
    }
}

/// Where the catalog and roster come from
pub trait SeedSource {
    /// Load a seed that already passed `Seed::validate`
    fn load(&self) -> Result<Seed>;
}
