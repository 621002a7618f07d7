//! Budgets, squads and the unsold list
//!
//! Only the sale finalizer writes here. Every write is checked in full
//! before anything is mutated, so a refused write leaves the ledger as
//! it was.
use crate::auction::{
    Amount, BidderId, BidderIdRef, InvariantViolation, ItemId, ItemIdRef, LotId,
};
use crate::seed::BidderSeed;

/// Lot recorded on purchases a bidder held before the auction began
pub const RETAINED_LOT: &str = "retained";
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Purchase {
    pub item: ItemId,
    pub lot: LotId,
    pub amount: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BidderAccount {
    pub id: BidderId,
    /// Position in the roster; breaks priority ties
    pub registration: usize,
    pub starting_budget: Amount,
    pub remaining: Amount,
    pub squad: Vec<Purchase>,
}

impl BidderAccount {
    pub fn spent(&self) -> Amount {
        self.starting_budget - self.remaining
    }

    pub fn can_afford(&self, amount: Amount) -> bool {
        amount <= self.remaining
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ledger {
    bidders: Vec<BidderAccount>,
    index: BTreeMap<BidderId, usize>,
    unsold: Vec<ItemId>,
    finalized: BTreeSet<ItemId>,
}

impl Ledger {
    /// Open accounts for `roster`, with retained items already owned and paid for
    pub fn new(roster: &[BidderSeed]) -> Self {
        let bidders: Vec<_> = roster
            .iter()
            .enumerate()
            .map(|(registration, seed)| BidderAccount {
                id: seed.id.clone(),
                registration,
                starting_budget: seed.starting_budget,
                remaining: seed.starting_budget.saturating_sub(seed.retained_cost()),
                squad: seed
                    .retained
                    .iter()
                    .map(|r| Purchase {
                        item: r.item.clone(),
                        lot: RETAINED_LOT.to_owned(),
                        amount: r.amount,
                    })
                    .collect(),
            })
            .collect();
        let finalized = roster
            .iter()
            .flat_map(|seed| seed.retained.iter().map(|r| r.item.clone()))
            .collect();
        let index = bidders
            .iter()
            .map(|bidder| (bidder.id.clone(), bidder.registration))
            .collect();
        Self {
            bidders,
            index,
            unsold: vec![],
            finalized,
        }
    }

    pub fn bidders(&self) -> &[BidderAccount] {
        &self.bidders
    }

    pub fn bidder(&self, id: BidderIdRef) -> Option<&BidderAccount> {
        self.index.get(id).map(|&i| &self.bidders[i])
    }

    pub fn unsold(&self) -> &[ItemId] {
        &self.unsold
    }

    fn ensure_open(&self, item: ItemIdRef) -> Result<(), InvariantViolation> {
        if self.finalized.contains(item) {
            return Err(InvariantViolation::AlreadyFinalized {
                item: item.to_owned(),
            });
        }
        Ok(())
    }

    /// Debit `bidder` and hand it the item
    pub fn award(
        &mut self,
        bidder: BidderIdRef,
        item: ItemIdRef,
        lot: &str,
        amount: Amount,
    ) -> Result<(), InvariantViolation> {
        self.ensure_open(item)?;
        let i = *self
            .index
            .get(bidder)
            .ok_or_else(|| InvariantViolation::UnknownBidder(bidder.to_owned()))?;
        let account = &mut self.bidders[i];
        if !account.can_afford(amount) {
            return Err(InvariantViolation::Overspend {
                bidder: bidder.to_owned(),
                item: item.to_owned(),
                amount,
                remaining: account.remaining,
            });
        }

        account.remaining -= amount;
        account.squad.push(Purchase {
            item: item.to_owned(),
            lot: lot.to_owned(),
            amount,
        });
        self.finalized.insert(item.to_owned());
        Ok(())
    }

    pub fn record_unsold(&mut self, item: ItemIdRef) -> Result<(), InvariantViolation> {
        self.ensure_open(item)?;
        self.unsold.push(item.to_owned());
        self.finalized.insert(item.to_owned());
        Ok(())
    }

    /// Spent budget must equal the price of everything owned
    pub fn check_balances(&self) -> Result<(), InvariantViolation> {
        for account in &self.bidders {
            let owned: Amount = account.squad.iter().map(|p| p.amount).sum();
            if owned != account.spent() {
                return Err(InvariantViolation::SpendMismatch {
                    bidder: account.id.clone(),
                    spent: account.spent(),
                    owned,
                });
            }
        }
        Ok(())
    }
}
