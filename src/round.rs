//! Bid round orchestration
//!
//! One round asks eligible bidders, in priority order and one at a
//! time, whether they raise. The first legal raise ends the round;
//! bidders after it are not consulted. Anything other than a legal
//! raise counts as a pass.
use crate::auction::{Amount, AuctionState, BidDetails, BidderId, Item};
use crate::catalog::LotSummary;
use crate::decision::{BidContext, BidDecider, Decision};
use crate::event::BidRejection;
use crate::increment::IncrementPolicy;
use crate::ledger::BidderAccount;
use tracing::{debug, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoundOutcome {
    Raise(BidDetails),
    NoRaise,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundReport {
    pub outcome: RoundOutcome,
    /// Bidders asked this round, in order
    pub consulted: Vec<BidderId>,
    pub rejections: Vec<(BidderId, BidRejection)>,
}

pub struct BidRound<'a> {
    pub policy: &'a IncrementPolicy,
    pub decider: &'a dyn BidDecider,
    pub remaining_lots: Vec<LotSummary>,
}

impl<'a> BidRound<'a> {
    pub fn minimum_bid(&self, state: &AuctionState) -> Amount {
        self.policy
            .minimum_next_bid(state.highest_price(), state.reserve)
    }

    /// `bidders` must already be eligible and ordered by priority
    pub fn run(&self, state: &AuctionState, item: &Item, bidders: &[&BidderAccount]) -> RoundReport {
        let minimum = self.minimum_bid(state);
        let mut consulted = vec![];
        let mut rejections = vec![];

        for bidder in bidders {
            consulted.push(bidder.id.clone());
            let context = BidContext::new(
                item,
                bidder,
                state.highest_bid.as_ref(),
                minimum,
                self.remaining_lots.clone(),
            );

            match self.evaluate(&context) {
                Ok(None) => {
                    debug!(item = %item.id, bidder = %bidder.id, "pass");
                }
                Ok(Some(amount)) => {
                    debug!(item = %item.id, bidder = %bidder.id, amount, "raise");
                    return RoundReport {
                        outcome: RoundOutcome::Raise(BidDetails::new(bidder.id.clone(), amount)),
                        consulted,
                        rejections,
                    };
                }
                Err(rejection) => {
                    warn!(
                        item = %item.id,
                        bidder = %bidder.id,
                        %rejection,
                        "bid rejected, counted as a pass"
                    );
                    rejections.push((bidder.id.clone(), rejection));
                }
            }
        }

        RoundReport {
            outcome: RoundOutcome::NoRaise,
            consulted,
            rejections,
        }
    }

    /// Legal bid amount, if the bidder raises at all
    fn evaluate(&self, context: &BidContext) -> Result<Option<Amount>, BidRejection> {
        let decision: Decision = self.decider.decide(context)?;
        let amount = match decision.amount(context) {
            None => return Ok(None),
            Some(amount) => amount,
        };

        if amount < context.minimum_bid {
            return Err(BidRejection::BelowMinimum {
                amount,
                minimum: context.minimum_bid,
            });
        }
        if amount > context.bidder.remaining {
            return Err(BidRejection::OverBudget {
                amount,
                remaining: context.bidder.remaining,
            });
        }
        Ok(Some(amount))
    }
}
