use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub type ItemId = String;
pub type ItemIdRef<'s> = &'s str;
pub type BidderId = String;
pub type BidderIdRef<'s> = &'s str;
pub type LotId = String;
pub type Amount = u64;

/// A core rule was about to be broken
///
/// Never recovered from: the auction halts and the offending
/// item/bidder/amount is reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("bidder {bidder} cannot pay {amount} for {item}: only {remaining} remaining")]
    Overspend {
        bidder: BidderId,
        item: ItemId,
        amount: Amount,
        remaining: Amount,
    },
    #[error("item {item} is already finalized")]
    AlreadyFinalized { item: ItemId },
    #[error("item {item} cannot move from {from:?} to {to:?}")]
    IllegalTransition {
        item: ItemId,
        from: Disposition,
        to: Disposition,
    },
    #[error("item {item} is still active")]
    ItemStillActive { item: ItemId },
    #[error("no item is active")]
    NoActiveItem,
    #[error("unknown item: {0}")]
    UnknownItem(ItemId),
    #[error("unknown bidder: {0}")]
    UnknownBidder(BidderId),
    #[error("bid {amount} by {bidder} on {item} does not beat {current}")]
    NonIncreasingBid {
        item: ItemId,
        bidder: BidderId,
        amount: Amount,
        current: Amount,
    },
    #[error("bid {amount} by {bidder} on {item} is below reserve {reserve}")]
    BelowReserve {
        item: ItemId,
        bidder: BidderId,
        amount: Amount,
        reserve: Amount,
    },
    #[error("bidder {bidder} spent {spent} but owns items worth {owned}")]
    SpendMismatch {
        bidder: BidderId,
        spent: Amount,
        owned: Amount,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Pending,
    Active,
    Sold,
    Unsold,
}

impl Disposition {
    pub fn is_final(self) -> bool {
        matches!(self, Disposition::Sold | Disposition::Unsold)
    }

    fn can_become(self, next: Disposition) -> bool {
        use Disposition::*;
        matches!(
            (self, next),
            (Pending, Active) | (Active, Sold) | (Active, Unsold)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidDetails {
    pub bidder: BidderId,
    pub price: Amount,
}

impl BidDetails {
    pub fn new(bidder: impl Into<BidderId>, price: Amount) -> Self {
        Self {
            bidder: bidder.into(),
            price,
        }
    }

    pub fn is_outbidded_by(&self, other: Amount) -> bool {
        self.price < other
    }
}

/// A single unit offered for sale (a player)
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Item {
    pub id: ItemId,
    pub lot: LotId,
    pub reserve: Amount,
    /// Display-only data, handed to collaborators as is
    pub attributes: BTreeMap<String, String>,
    pub highest_bid: Option<BidDetails>,
    pub disposition: Disposition,
}

impl Item {
    pub(crate) fn transition(&mut self, next: Disposition) -> Result<(), InvariantViolation> {
        if self.disposition.is_final() {
            return Err(InvariantViolation::AlreadyFinalized {
                item: self.id.clone(),
            });
        }
        if !self.disposition.can_become(next) {
            return Err(InvariantViolation::IllegalTransition {
                item: self.id.clone(),
                from: self.disposition,
                to: next,
            });
        }
        self.disposition = next;
        Ok(())
    }

    pub(crate) fn record_bid(&mut self, bid: BidDetails) -> Result<(), InvariantViolation> {
        if self.disposition != Disposition::Active {
            return Err(InvariantViolation::IllegalTransition {
                item: self.id.clone(),
                from: self.disposition,
                to: Disposition::Active,
            });
        }
        ensure_beats(&self.id, self.reserve, self.highest_bid.as_ref(), &bid)?;
        self.highest_bid = Some(bid);
        Ok(())
    }
}

/// The item currently under the hammer
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuctionState {
    pub item: ItemId,
    pub lot: LotId,
    pub reserve: Amount,
    pub highest_bid: Option<BidDetails>,
    /// Consecutive rounds without a raise since the last accepted one
    pub round: u8,
}

impl AuctionState {
    pub fn new(item: &Item) -> Self {
        Self {
            item: item.id.clone(),
            lot: item.lot.clone(),
            reserve: item.reserve,
            highest_bid: None,
            round: 0,
        }
    }

    pub fn highest_price(&self) -> Option<Amount> {
        self.highest_bid.as_ref().map(|bid| bid.price)
    }

    pub fn leader(&self) -> Option<BidderIdRef<'_>> {
        self.highest_bid.as_ref().map(|bid| bid.bidder.as_str())
    }

    pub(crate) fn accept(&mut self, bid: BidDetails) -> Result<(), InvariantViolation> {
        ensure_beats(&self.item, self.reserve, self.highest_bid.as_ref(), &bid)?;
        self.highest_bid = Some(bid);
        self.round = 0;
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ActiveAuction {
    #[default]
    NoActiveItem,
    Active(AuctionState),
}

impl ActiveAuction {
    pub fn state(&self) -> Option<&AuctionState> {
        match self {
            ActiveAuction::NoActiveItem => None,
            ActiveAuction::Active(state) => Some(state),
        }
    }
}

fn ensure_beats(
    item: ItemIdRef,
    reserve: Amount,
    current: Option<&BidDetails>,
    bid: &BidDetails,
) -> Result<(), InvariantViolation> {
    if bid.price < reserve {
        return Err(InvariantViolation::BelowReserve {
            item: item.to_owned(),
            bidder: bid.bidder.clone(),
            amount: bid.price,
            reserve,
        });
    }
    if let Some(current) = current {
        if !current.is_outbidded_by(bid.price) {
            return Err(InvariantViolation::NonIncreasingBid {
                item: item.to_owned(),
                bidder: bid.bidder.clone(),
                amount: bid.price,
                current: current.price,
            });
        }
    }
    Ok(())
}
