//! Bid-decision collaborator
//!
//! Whoever decides a bidder's intent (a model, a script, a human) only
//! sees a read-only `BidContext` and answers with a `Decision`. The
//! rules on what counts as a legal raise are enforced by the bid round,
//! not here.
mod deadline;
mod heuristic;

pub use self::{deadline::*, heuristic::*};
use crate::auction::{Amount, BidDetails, BidderId, Item, ItemId, LotId};
use crate::catalog::LotSummary;
use crate::event::BidRejection;
use crate::ledger::{BidderAccount, Purchase};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ItemView {
    pub id: ItemId,
    pub lot: LotId,
    pub reserve: Amount,
    pub attributes: BTreeMap<String, String>,
}

/// What a bidder may know about itself
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BidderView {
    pub id: BidderId,
    pub remaining: Amount,
    pub squad: Vec<Purchase>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BidContext {
    pub item: ItemView,
    pub bidder: BidderView,
    pub highest_bid: Option<BidDetails>,
    pub minimum_bid: Amount,
    pub remaining_lots: Vec<LotSummary>,
}

impl BidContext {
    pub fn new(
        item: &Item,
        bidder: &BidderAccount,
        highest_bid: Option<&BidDetails>,
        minimum_bid: Amount,
        remaining_lots: Vec<LotSummary>,
    ) -> Self {
        Self {
            item: ItemView {
                id: item.id.clone(),
                lot: item.lot.clone(),
                reserve: item.reserve,
                attributes: item.attributes.clone(),
            },
            bidder: BidderView {
                id: bidder.id.clone(),
                remaining: bidder.remaining,
                squad: bidder.squad.clone(),
            },
            highest_bid: highest_bid.cloned(),
            minimum_bid,
            remaining_lots,
        }
    }

    /// Price the bidding currently stands at
    pub fn current_price(&self) -> Amount {
        self.highest_bid
            .as_ref()
            .map(|bid| bid.price)
            .unwrap_or(self.item.reserve)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Pass,
    /// Bid exactly the minimum legal next bid
    NormalRaise,
    /// Add this much on top of the current price
    RaiseBy(Amount),
    /// Bid this absolute amount
    Raise(Amount),
}

impl Decision {
    /// Absolute amount bid, `None` for a pass
    pub fn amount(self, context: &BidContext) -> Option<Amount> {
        match self {
            Decision::Pass => None,
            Decision::NormalRaise => Some(context.minimum_bid),
            Decision::RaiseBy(by) => Some(context.current_price().saturating_add(by)),
            Decision::Raise(amount) => Some(amount),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecisionError {
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("bidder unavailable: {0}")]
    Unavailable(String),
    #[error("no response within {0:?}")]
    Timeout(Duration),
}

impl From<DecisionError> for BidRejection {
    fn from(e: DecisionError) -> Self {
        match e {
            DecisionError::Malformed(reason) => BidRejection::Malformed(reason),
            DecisionError::Unavailable(reason) => BidRejection::Unavailable(reason),
            DecisionError::Timeout(timeout) => BidRejection::Timeout(
                u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            ),
        }
    }
}

impl From<serde_json::Error> for DecisionError {
    fn from(e: serde_json::Error) -> Self {
        DecisionError::Malformed(e.to_string())
    }
}

/// Wire format of a bid decision
///
/// `raised_amount` is an increment over the current price and only
/// meaningful for a raise that is not normal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidResponse {
    pub is_raise: bool,
    #[serde(default)]
    pub is_normal: Option<bool>,
    #[serde(default)]
    pub raised_amount: Option<Amount>,
}

impl BidResponse {
    /// Parse free-form text holding a JSON response
    ///
    /// Falls back to the outermost `{...}` span when the text carries
    /// anything around the object.
    pub fn parse(text: &str) -> Result<Decision, DecisionError> {
        let response: BidResponse = match serde_json::from_str(text) {
            Ok(response) => response,
            Err(e) => match (text.find('{'), text.rfind('}')) {
                (Some(start), Some(end)) if start < end => {
                    serde_json::from_str(&text[start..=end])?
                }
                _ => return Err(e.into()),
            },
        };
        Decision::try_from(response)
    }
}

impl TryFrom<BidResponse> for Decision {
    type Error = DecisionError;

    fn try_from(response: BidResponse) -> Result<Self, Self::Error> {
        use DecisionError::Malformed;

        match response {
            BidResponse {
                is_raise: false,
                raised_amount: Some(_),
                ..
            } => Err(Malformed("raised_amount given without a raise".into())),
            BidResponse {
                is_raise: false, ..
            } => Ok(Decision::Pass),
            BidResponse {
                is_normal: None, ..
            } => Err(Malformed("is_normal missing on a raise".into())),
            BidResponse {
                is_normal: Some(true),
                raised_amount: Some(_),
                ..
            } => Err(Malformed("raised_amount given for a normal raise".into())),
            BidResponse {
                is_normal: Some(true),
                ..
            } => Ok(Decision::NormalRaise),
            BidResponse {
                raised_amount: None,
                ..
            } => Err(Malformed("raised_amount missing on a custom raise".into())),
            BidResponse {
                raised_amount: Some(0),
                ..
            } => Err(Malformed("raised_amount must be positive".into())),
            BidResponse {
                raised_amount: Some(by),
                ..
            } => Ok(Decision::RaiseBy(by)),
        }
    }
}

/// Decides, for one bidder, whether and how much to bid
///
/// Calls are serialized by the bid round; implementations may block.
pub trait BidDecider: Send + Sync {
    fn decide(&self, context: &BidContext) -> Result<Decision, DecisionError>;
}

pub type SharedBidDecider = Arc<dyn BidDecider + 'static>;

impl<D: BidDecider + ?Sized> BidDecider for Arc<D> {
    fn decide(&self, context: &BidContext) -> Result<Decision, DecisionError> {
        (**self).decide(context)
    }
}

/// Decider backed by a function producing a raw text response
pub struct TextDecider<F> {
    respond: F,
}

impl<F> TextDecider<F>
where
    F: Fn(&BidContext) -> anyhow::Result<String> + Send + Sync,
{
    pub fn new(respond: F) -> Self {
        Self { respond }
    }
}

impl<F> BidDecider for TextDecider<F>
where
    F: Fn(&BidContext) -> anyhow::Result<String> + Send + Sync,
{
    fn decide(&self, context: &BidContext) -> Result<Decision, DecisionError> {
        let text = (self.respond)(context)
            .map_err(|e| DecisionError::Unavailable(format!("{:#}", e)))?;
        BidResponse::parse(&text)
    }
}
