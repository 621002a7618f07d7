//! Who gets asked first
//!
//! Eligibility and ordering are pure functions of the ledger and of the
//! recent interest signals, recomputed every round.
use crate::auction::{Amount, BidderId, BidderIdRef};
use crate::ledger::BidderAccount;
use std::collections::{BTreeMap, VecDeque};

/// Raises accepted per bidder over a sliding window of items
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InterestSignals {
    window: usize,
    current: BTreeMap<BidderId, u32>,
    recent: VecDeque<BTreeMap<BidderId, u32>>,
}

impl InterestSignals {
    /// Keep raises from the active item and the last `window` closed ones
    pub fn new(window: usize) -> Self {
        Self {
            window,
            ..Default::default()
        }
    }

    pub fn record_raise(&mut self, bidder: BidderIdRef) {
        *self.current.entry(bidder.to_owned()).or_default() += 1;
    }

    pub fn close_item(&mut self) {
        let closed = std::mem::take(&mut self.current);
        if self.window == 0 {
            return;
        }
        self.recent.push_back(closed);
        while self.recent.len() > self.window {
            self.recent.pop_front();
        }
    }

    pub fn weight(&self, bidder: BidderIdRef) -> u32 {
        std::iter::once(&self.current)
            .chain(self.recent.iter())
            .filter_map(|raises| raises.get(bidder))
            .sum()
    }
}

/// Bidders that can afford `minimum`, minus the current leader if given
pub fn eligible_bidders<'a>(
    bidders: &'a [BidderAccount],
    minimum: Amount,
    leader: Option<BidderIdRef>,
) -> Vec<&'a BidderAccount> {
    bidders
        .iter()
        .filter(|bidder| bidder.can_afford(minimum))
        .filter(|bidder| leader != Some(bidder.id.as_str()))
        .collect()
}

/// Most interested first; ties keep roster order
pub fn order_bidders<'a>(
    mut bidders: Vec<&'a BidderAccount>,
    interest: &InterestSignals,
) -> Vec<&'a BidderAccount> {
    bidders.sort_by(|a, b| {
        interest
            .weight(&b.id)
            .cmp(&interest.weight(&a.id))
            .then(a.registration.cmp(&b.registration))
    });
    bidders
}
