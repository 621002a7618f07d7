//! Read-only view of the auction for dashboards and exports
use crate::auction::{ActiveAuction, Amount, BidderId, Item, ItemId, LotId};
use crate::catalog::{Catalog, CompletionProgress};
use crate::ledger::{Ledger, Purchase};
use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Running,
    Complete,
    /// Ended early on request; the unauctioned items stay pending
    Stopped,
    Halted,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BidderSummary {
    pub id: BidderId,
    pub starting_budget: Amount,
    pub remaining: Amount,
    pub spent: Amount,
    pub squad: Vec<Purchase>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AuctionSnapshot {
    pub status: Status,
    pub active_item: Option<Item>,
    pub auction: ActiveAuction,
    pub bidders: Vec<BidderSummary>,
    pub unsold: Vec<ItemId>,
    pub progress: CompletionProgress,
}

impl AuctionSnapshot {
    pub fn capture(
        status: Status,
        catalog: &Catalog,
        ledger: &Ledger,
        auction: &ActiveAuction,
    ) -> Self {
        Self {
            status,
            active_item: catalog.active_item().cloned(),
            auction: auction.clone(),
            bidders: summarize(ledger),
            unsold: ledger.unsold().to_vec(),
            progress: catalog.progress(),
        }
    }
}

/// One row per sale, for tabular export
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PurchaseRow {
    pub bidder: BidderId,
    pub item: ItemId,
    pub lot: LotId,
    pub amount: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuctionResult {
    pub bidders: Vec<BidderSummary>,
    pub purchases: Vec<PurchaseRow>,
    pub unsold: Vec<ItemId>,
    pub narratives: BTreeMap<ItemId, String>,
}

impl AuctionResult {
    pub fn capture(ledger: &Ledger, narratives: &BTreeMap<ItemId, String>) -> Self {
        let purchases = ledger
            .bidders()
            .iter()
            .flat_map(|bidder| {
                bidder.squad.iter().map(move |purchase| PurchaseRow {
                    bidder: bidder.id.clone(),
                    item: purchase.item.clone(),
                    lot: purchase.lot.clone(),
                    amount: purchase.amount,
                })
            })
            .collect();
        Self {
            bidders: summarize(ledger),
            purchases,
            unsold: ledger.unsold().to_vec(),
            narratives: narratives.clone(),
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

fn summarize(ledger: &Ledger) -> Vec<BidderSummary> {
    ledger
        .bidders()
        .iter()
        .map(|bidder| BidderSummary {
            id: bidder.id.clone(),
            starting_budget: bidder.starting_budget,
            remaining: bidder.remaining,
            spent: bidder.spent(),
            squad: bidder.squad.clone(),
        })
        .collect()
}

/// Latest published state
///
/// The controller publishes between steps; readers never see a
/// half-applied round.
#[derive(Default)]
pub struct Observer {
    snapshot: RwLock<AuctionSnapshot>,
    result: RwLock<Option<AuctionResult>>,
}

pub type SharedObserver = Arc<Observer>;

impl Observer {
    pub fn new_shared() -> SharedObserver {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> AuctionSnapshot {
        self.snapshot.read().clone()
    }

    pub fn result(&self) -> Option<AuctionResult> {
        self.result.read().clone()
    }

    pub(crate) fn publish(&self, snapshot: AuctionSnapshot) {
        *self.snapshot.write() = snapshot;
    }

    pub(crate) fn publish_result(&self, result: AuctionResult) {
        *self.result.write() = Some(result);
    }
}
