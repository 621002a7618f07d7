//! Sale finalization
//!
//! `SaleFinalizer::advance` is the state machine deciding whether the
//! active item keeps going, sells or goes unsold; `settle` applies a
//! terminal outcome to the catalog and the ledger.
use crate::auction::{
    Amount, AuctionState, BidDetails, BidderId, Disposition, InvariantViolation,
};
use crate::catalog::Catalog;
use crate::ledger::Ledger;
use crate::round::RoundOutcome;
use tracing::info;

pub const DEFAULT_ROUND_LIMIT: u8 = 2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Advance {
    Continue,
    Sold { bidder: BidderId, amount: Amount },
    Unsold,
}

impl Advance {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Advance::Continue)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SaleFinalizer {
    /// Consecutive no-raise rounds, counted from the last accepted
    /// raise, that close a sale
    ///
    /// An item nobody has bid on closes after its first silent round
    /// regardless of this limit.
    round_limit: u8,
}

impl Default for SaleFinalizer {
    fn default() -> Self {
        Self {
            round_limit: DEFAULT_ROUND_LIMIT,
        }
    }
}

impl SaleFinalizer {
    pub fn new(round_limit: u8) -> Self {
        Self {
            round_limit: round_limit.max(1),
        }
    }

    pub fn round_limit(&self) -> u8 {
        self.round_limit
    }

    pub fn advance(
        &self,
        state: &mut AuctionState,
        outcome: &RoundOutcome,
    ) -> Result<Advance, InvariantViolation> {
        match outcome {
            RoundOutcome::Raise(bid) => {
                state.accept(bid.clone())?;
                Ok(Advance::Continue)
            }
            RoundOutcome::NoRaise => {
                state.round = state.round.saturating_add(1);
                Ok(match &state.highest_bid {
                    None => Advance::Unsold,
                    Some(BidDetails { bidder, price }) if state.round >= self.round_limit => {
                        Advance::Sold {
                            bidder: bidder.clone(),
                            amount: *price,
                        }
                    }
                    Some(_) => Advance::Continue,
                })
            }
        }
    }

    /// Apply a terminal outcome
    ///
    /// Both the catalog and the ledger are checked before either is
    /// touched.
    pub fn settle(
        &self,
        state: &AuctionState,
        advance: &Advance,
        catalog: &mut Catalog,
        ledger: &mut Ledger,
    ) -> Result<(), InvariantViolation> {
        catalog.ensure_active(&state.item)?;
        match advance {
            Advance::Continue => Ok(()),
            Advance::Sold { bidder, amount } => {
                ledger.award(bidder, &state.item, &state.lot, *amount)?;
                catalog.finalize(&state.item, Disposition::Sold)?;
                info!(item = %state.item, bidder = %bidder, amount, "sold");
                Ok(())
            }
            Advance::Unsold => {
                ledger.record_unsold(&state.item)?;
                catalog.finalize(&state.item, Disposition::Unsold)?;
                info!(item = %state.item, "unsold");
                Ok(())
            }
        }
    }
}
