//! Auction controller (the host)
//!
//! Drives item selection, bid rounds and finalization until the catalog
//! is exhausted. All state changes happen here, one item at a time;
//! observers only ever see what `publish` hands them.
use crate::auction::{
    ActiveAuction, Amount, BidderIdRef, InvariantViolation, ItemId, ItemIdRef,
};
use crate::catalog::{Catalog, Lot, Selection};
use crate::config::AuctionConfig;
use crate::decision::SharedBidDecider;
use crate::event::Event;
use crate::event_log;
use crate::finalizer::{Advance, SaleFinalizer};
use crate::increment::IncrementPolicy;
use crate::ledger::Ledger;
use crate::narrative::{SaleContext, SaleNarrator, SharedSaleNarrator};
use crate::observer::{AuctionResult, AuctionSnapshot, Observer, SharedObserver, Status};
use crate::priority::{self, InterestSignals};
use crate::round::{BidRound, RoundOutcome, RoundReport};
use crate::seed::{Seed, SeedError};
use crate::service::LoopService;
use anyhow::Result;
use std::collections::BTreeMap;
use std::ops::ControlFlow;
use tracing::{debug, error, info, warn};

pub struct AuctionController {
    catalog: Catalog,
    ledger: Ledger,
    active: ActiveAuction,
    interest: InterestSignals,
    policy: IncrementPolicy,
    finalizer: SaleFinalizer,
    exclude_leader: bool,
    decider: SharedBidDecider,
    narrator: Option<SharedSaleNarrator>,
    narratives: BTreeMap<ItemId, String>,
    event_writer: event_log::SharedWriter,
    observer: SharedObserver,
    status: Status,
}

impl AuctionController {
    pub fn new(
        seed: &Seed,
        config: &AuctionConfig,
        decider: SharedBidDecider,
        event_writer: event_log::SharedWriter,
    ) -> Result<Self, SeedError> {
        seed.validate()?;

        let controller = Self {
            catalog: Catalog::new(&seed.lots),
            ledger: Ledger::new(&seed.bidders),
            active: ActiveAuction::NoActiveItem,
            interest: InterestSignals::new(config.interest_window),
            policy: config.increment_tiers.clone(),
            finalizer: SaleFinalizer::new(config.round_limit),
            exclude_leader: config.exclude_current_leader,
            decider,
            narrator: None,
            narratives: BTreeMap::new(),
            event_writer,
            observer: Observer::new_shared(),
            status: Status::Running,
        };
        controller.publish();
        Ok(controller)
    }

    pub fn with_narrator(mut self, narrator: SharedSaleNarrator) -> Self {
        self.narrator = Some(narrator);
        self
    }

    pub fn observer(&self) -> SharedObserver {
        self.observer.clone()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn active(&self) -> &ActiveAuction {
        &self.active
    }

    pub fn snapshot(&self) -> AuctionSnapshot {
        AuctionSnapshot::capture(self.status, &self.catalog, &self.ledger, &self.active)
    }

    pub fn result(&self) -> AuctionResult {
        AuctionResult::capture(&self.ledger, &self.narratives)
    }

    /// Take one item from selection to sold/unsold
    ///
    /// Breaks once the catalog is exhausted. An error means an invariant
    /// broke: the controller is halted and keeps its state for
    /// inspection.
    pub fn step_item(&mut self) -> Result<ControlFlow<()>> {
        if self.status != Status::Running {
            return Ok(ControlFlow::Break(()));
        }
        self.process_next_item().map_err(|e| {
            self.halt(&e);
            e
        })
    }

    pub fn run_to_completion(&mut self) -> Result<AuctionResult> {
        while self.step_item()?.is_continue() {}
        Ok(self.result())
    }

    fn process_next_item(&mut self) -> Result<ControlFlow<()>> {
        let state = match self.catalog.next_item()? {
            Selection::AuctionComplete => {
                self.complete()?;
                return Ok(ControlFlow::Break(()));
            }
            Selection::Item(state) => state,
        };

        info!(item = %state.item, lot = %state.lot, reserve = state.reserve, "item opened");
        self.emit(&[Event::ItemOpened {
            item: state.item.clone(),
            lot: state.lot.clone(),
            reserve: state.reserve,
        }])?;
        self.active = ActiveAuction::Active(state);
        self.publish();

        loop {
            let report = self.run_round()?;
            let advance = self.apply_round(report)?;
            self.publish();
            if advance.is_terminal() {
                return Ok(ControlFlow::Continue(()));
            }
        }
    }

    fn run_round(&self) -> Result<RoundReport, InvariantViolation> {
        let state = self.active.state().ok_or(InvariantViolation::NoActiveItem)?;
        let item = self
            .catalog
            .item(&state.item)
            .ok_or_else(|| InvariantViolation::UnknownItem(state.item.clone()))?;

        let round = BidRound {
            policy: &self.policy,
            decider: &*self.decider,
            remaining_lots: self.catalog.remaining_lots(),
        };
        let leader = if self.exclude_leader {
            state.leader()
        } else {
            None
        };
        let eligible =
            priority::eligible_bidders(self.ledger.bidders(), round.minimum_bid(state), leader);
        let ordered = priority::order_bidders(eligible, &self.interest);

        Ok(round.run(state, item, &ordered))
    }

    fn apply_round(&mut self, report: RoundReport) -> Result<Advance> {
        let state = match &mut self.active {
            ActiveAuction::Active(state) => state,
            ActiveAuction::NoActiveItem => return Err(InvariantViolation::NoActiveItem.into()),
        };

        let mut events: Vec<_> = report
            .rejections
            .into_iter()
            .map(|(bidder, reason)| Event::BidRejected {
                item: state.item.clone(),
                bidder,
                reason,
            })
            .collect();

        let advance = self.finalizer.advance(state, &report.outcome)?;
        match &report.outcome {
            RoundOutcome::Raise(bid) => {
                self.catalog.record_bid(&state.item, bid.clone())?;
                self.interest.record_raise(&bid.bidder);
                info!(item = %state.item, bidder = %bid.bidder, amount = bid.price, "raise accepted");
                events.push(Event::RaiseAccepted {
                    item: state.item.clone(),
                    bidder: bid.bidder.clone(),
                    amount: bid.price,
                });
            }
            RoundOutcome::NoRaise => {
                debug!(item = %state.item, round = state.round, "round closed without a raise");
                events.push(Event::RoundClosed {
                    item: state.item.clone(),
                    round: state.round,
                });
            }
        }

        if advance.is_terminal() {
            self.finalizer
                .settle(state, &advance, &mut self.catalog, &mut self.ledger)?;
            self.ledger.check_balances()?;

            let item = state.item.clone();
            let lot = state.lot.clone();
            match &advance {
                Advance::Sold { bidder, amount } => {
                    events.push(Event::Sold {
                        item: item.clone(),
                        bidder: bidder.clone(),
                        amount: *amount,
                    });
                    if let Some(text) = narrate(
                        self.narrator.as_deref(),
                        &self.catalog,
                        &self.ledger,
                        &item,
                        bidder,
                        *amount,
                    ) {
                        self.narratives.insert(item.clone(), text.clone());
                        events.push(Event::Narrative {
                            item: item.clone(),
                            text,
                        });
                    }
                }
                Advance::Unsold => events.push(Event::Unsold { item: item.clone() }),
                Advance::Continue => {}
            }

            self.interest.close_item();
            if self.catalog.lot(&lot).map(Lot::is_complete).unwrap_or(false) {
                info!(lot = %lot, "lot completed");
                events.push(Event::LotCompleted { lot });
            }
            self.active = ActiveAuction::NoActiveItem;
        }

        self.emit(&events)?;
        Ok(advance)
    }

    fn complete(&mut self) -> Result<()> {
        self.ledger.check_balances()?;
        self.status = Status::Complete;

        let progress = self.catalog.progress();
        info!(
            sold = progress.items_sold,
            unsold = progress.items_unsold,
            "auction complete"
        );
        self.emit(&[Event::AuctionComplete])?;
        self.observer.publish_result(self.result());
        self.publish();
        Ok(())
    }

    fn halt(&mut self, e: &anyhow::Error) {
        error!(
            error = %format!("{:#}", e),
            item = ?self.active.state().map(|state| &state.item),
            "auction halted"
        );
        self.status = Status::Halted;
        if let Err(write_err) = self.emit(&[Event::Halted {
            reason: format!("{:#}", e),
        }]) {
            warn!(error = %write_err, "failed to log halt");
        }
        self.publish();
    }

    /// End a running auction early, leaving pending items untouched
    pub fn stop(&mut self) {
        if self.status != Status::Running {
            return;
        }
        let progress = self.catalog.progress();
        info!(
            sold = progress.items_sold,
            pending = progress.items_pending,
            "auction stopped"
        );
        self.status = Status::Stopped;
        if let Err(e) = self.emit(&[Event::Stopped]) {
            warn!(error = %e, "failed to log stop");
        }
        self.publish();
    }

    fn emit(&self, events: &[Event]) -> Result<()> {
        if !events.is_empty() {
            self.event_writer.write(events)?;
        }
        Ok(())
    }

    fn publish(&self) {
        self.observer.publish(self.snapshot());
    }
}

impl LoopService for AuctionController {
    fn run_iteration(&mut self) -> Result<ControlFlow<()>> {
        self.step_item()
    }

    fn stopped(&mut self) {
        self.stop();
    }
}

fn narrate(
    narrator: Option<&dyn SaleNarrator>,
    catalog: &Catalog,
    ledger: &Ledger,
    item: ItemIdRef,
    bidder: BidderIdRef,
    amount: Amount,
) -> Option<String> {
    let narrator = narrator?;
    let context = SaleContext {
        item: catalog.item(item)?,
        winner: ledger.bidder(bidder)?,
        amount,
    };
    match narrator.explain(&context) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(item = %item, error = %format!("{:#}", e), "sale narrative failed");
            None
        }
    }
}
