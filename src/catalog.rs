//! Catalog of lots and the item selector walking it
use crate::auction::{
    AuctionState, BidDetails, Disposition, InvariantViolation, Item, ItemIdRef, LotId,
};
use crate::seed::LotSeed;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Lot {
    pub id: LotId,
    pub items: Vec<Item>,
}

impl Lot {
    pub fn is_complete(&self) -> bool {
        self.items.iter().all(|item| item.disposition.is_final())
    }

    fn pending(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.disposition == Disposition::Pending)
            .count()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LotSummary {
    pub id: LotId,
    pub pending: usize,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CompletionProgress {
    pub lots_total: usize,
    pub lots_completed: usize,
    pub items_total: usize,
    pub items_pending: usize,
    pub items_sold: usize,
    pub items_unsold: usize,
}

pub enum Selection {
    Item(AuctionState),
    AuctionComplete,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
struct Cursor {
    lot: usize,
    item: usize,
}

#[derive(Clone, Debug)]
pub struct Catalog {
    lots: Vec<Lot>,
    index: BTreeMap<String, (usize, usize)>,
    cursor: Cursor,
    active: Option<(usize, usize)>,
}

impl Catalog {
    pub fn new(seed: &[LotSeed]) -> Self {
        let lots: Vec<Lot> = seed
            .iter()
            .map(|lot| Lot {
                id: lot.id.clone(),
                items: lot
                    .items
                    .iter()
                    .map(|item| Item {
                        id: item.id.clone(),
                        lot: lot.id.clone(),
                        reserve: item.reserve,
                        attributes: item.attributes.clone(),
                        highest_bid: None,
                        disposition: Disposition::Pending,
                    })
                    .collect(),
            })
            .collect();

        let index = lots
            .iter()
            .enumerate()
            .flat_map(|(l, lot)| {
                lot.items
                    .iter()
                    .enumerate()
                    .map(move |(i, item)| (item.id.clone(), (l, i)))
            })
            .collect();

        Self {
            lots,
            index,
            cursor: Cursor::default(),
            active: None,
        }
    }

    pub fn item(&self, id: ItemIdRef) -> Option<&Item> {
        self.index.get(id).map(|&(l, i)| &self.lots[l].items[i])
    }

    pub fn active_item(&self) -> Option<&Item> {
        self.active.map(|(l, i)| &self.lots[l].items[i])
    }

    /// Pick the next pending item, activating it
    ///
    /// Lots are walked in catalog order and never revisited once the
    /// cursor has moved past them.
    pub fn next_item(&mut self) -> Result<Selection, InvariantViolation> {
        if let Some(item) = self.active_item() {
            return Err(InvariantViolation::ItemStillActive {
                item: item.id.clone(),
            });
        }

        while let Some(lot) = self.lots.get_mut(self.cursor.lot) {
            let next = lot
                .items
                .iter()
                .skip(self.cursor.item)
                .position(|item| item.disposition == Disposition::Pending)
                .map(|offset| self.cursor.item + offset);

            match next {
                Some(i) => {
                    let item = &mut lot.items[i];
                    item.transition(Disposition::Active)?;
                    self.cursor.item = i + 1;
                    self.active = Some((self.cursor.lot, i));
                    return Ok(Selection::Item(AuctionState::new(item)));
                }
                None => {
                    debug!(lot = %lot.id, "lot exhausted");
                    self.cursor = Cursor {
                        lot: self.cursor.lot + 1,
                        item: 0,
                    };
                }
            }
        }
        Ok(Selection::AuctionComplete)
    }

    fn active_mut(&mut self, id: ItemIdRef) -> Result<&mut Item, InvariantViolation> {
        let position = *self
            .index
            .get(id)
            .ok_or_else(|| InvariantViolation::UnknownItem(id.to_owned()))?;
        let item = &mut self.lots[position.0].items[position.1];
        if self.active != Some(position) {
            return Err(if item.disposition.is_final() {
                InvariantViolation::AlreadyFinalized {
                    item: id.to_owned(),
                }
            } else {
                InvariantViolation::IllegalTransition {
                    item: id.to_owned(),
                    from: item.disposition,
                    to: Disposition::Sold,
                }
            });
        }
        Ok(item)
    }

    /// Fail unless `id` is the item under the hammer
    pub fn ensure_active(&mut self, id: ItemIdRef) -> Result<(), InvariantViolation> {
        self.active_mut(id).map(|_| ())
    }

    pub(crate) fn record_bid(
        &mut self,
        id: ItemIdRef,
        bid: BidDetails,
    ) -> Result<(), InvariantViolation> {
        self.active_mut(id)?.record_bid(bid)
    }

    pub(crate) fn finalize(
        &mut self,
        id: ItemIdRef,
        disposition: Disposition,
    ) -> Result<&Item, InvariantViolation> {
        self.active_mut(id)?.transition(disposition)?;
        self.active = None;
        self.item(id)
            .ok_or_else(|| InvariantViolation::UnknownItem(id.to_owned()))
    }

    pub fn lot(&self, id: &str) -> Option<&Lot> {
        self.lots.iter().find(|lot| lot.id == id)
    }

    /// Lots that still hold unsold-and-unfinished business
    pub fn remaining_lots(&self) -> Vec<LotSummary> {
        self.lots
            .iter()
            .filter(|lot| !lot.is_complete())
            .map(|lot| LotSummary {
                id: lot.id.clone(),
                pending: lot.pending(),
            })
            .collect()
    }

    pub fn progress(&self) -> CompletionProgress {
        let mut progress = CompletionProgress {
            lots_total: self.lots.len(),
            ..Default::default()
        };
        for lot in &self.lots {
            if lot.is_complete() {
                progress.lots_completed += 1;
            }
            for item in &lot.items {
                progress.items_total += 1;
                match item.disposition {
                    Disposition::Pending | Disposition::Active => progress.items_pending += 1,
                    Disposition::Sold => progress.items_sold += 1,
                    Disposition::Unsold => progress.items_unsold += 1,
                }
            }
        }
        progress
    }
}
