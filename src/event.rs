use crate::auction::*;
use serde::Serialize;
use thiserror::Error;

/// Everything observable that happens during an auction
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    ItemOpened {
        item: ItemId,
        lot: LotId,
        reserve: Amount,
    },
    RaiseAccepted {
        item: ItemId,
        bidder: BidderId,
        amount: Amount,
    },
    /// A bidder's response was discarded and counted as a pass
    BidRejected {
        item: ItemId,
        bidder: BidderId,
        reason: BidRejection,
    },
    /// A round ended without a raise
    RoundClosed {
        item: ItemId,
        round: u8,
    },
    Sold {
        item: ItemId,
        bidder: BidderId,
        amount: Amount,
    },
    Unsold {
        item: ItemId,
    },
    Narrative {
        item: ItemId,
        text: String,
    },
    LotCompleted {
        lot: LotId,
    },
    AuctionComplete,
    /// A stop request ended the auction between items
    Stopped,
    /// The auction halted on a broken invariant
    Halted {
        reason: String,
    },
    #[cfg(test)]
    Test,
}

/// Why a bidder's response did not count as a raise
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BidRejection {
    #[error("bid {amount} is below the minimum legal bid {minimum}")]
    BelowMinimum { amount: Amount, minimum: Amount },
    #[error("bid {amount} exceeds the remaining budget {remaining}")]
    OverBudget { amount: Amount, remaining: Amount },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("bidder unavailable: {0}")]
    Unavailable(String),
    #[error("no response within {0} ms")]
    Timeout(u64),
}
