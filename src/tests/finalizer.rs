use super::seed;
use crate::{
    auction::{AuctionState, BidDetails, Disposition, InvariantViolation},
    catalog::{Catalog, Selection},
    finalizer::{Advance, SaleFinalizer},
    ledger::Ledger,
    round::RoundOutcome,
};
use anyhow::{bail, Result};

fn raise(bidder: &str, price: u64) -> RoundOutcome {
    RoundOutcome::Raise(BidDetails::new(bidder, price))
}

fn open(catalog: &mut Catalog) -> Result<AuctionState> {
    match catalog.next_item()? {
        Selection::Item(state) => Ok(state),
        Selection::AuctionComplete => bail!("catalog is empty"),
    }
}

#[test]
fn unbid_item_closes_after_one_silent_round() -> Result<()> {
    let seed = seed(&[("L1", &[("p1", 100)])], &[("a", 1_000)]);
    let mut state = open(&mut Catalog::new(&seed.lots))?;

    let advance = SaleFinalizer::default().advance(&mut state, &RoundOutcome::NoRaise)?;

    assert_eq!(advance, Advance::Unsold);
    Ok(())
}

#[test]
fn raise_resets_the_countdown() -> Result<()> {
    let seed = seed(&[("L1", &[("p1", 100)])], &[("a", 1_000)]);
    let mut state = open(&mut Catalog::new(&seed.lots))?;
    let finalizer = SaleFinalizer::default();

    assert_eq!(finalizer.advance(&mut state, &raise("a", 100))?, Advance::Continue);
    assert_eq!(finalizer.advance(&mut state, &RoundOutcome::NoRaise)?, Advance::Continue);
    assert_eq!(state.round, 1);

    assert_eq!(finalizer.advance(&mut state, &raise("b", 110))?, Advance::Continue);
    assert_eq!(state.round, 0);
    assert_eq!(finalizer.advance(&mut state, &RoundOutcome::NoRaise)?, Advance::Continue);
    assert_eq!(
        finalizer.advance(&mut state, &RoundOutcome::NoRaise)?,
        Advance::Sold {
            bidder: "b".into(),
            amount: 110
        }
    );
    Ok(())
}

#[test]
fn round_limit_is_configurable() -> Result<()> {
    let seed = seed(&[("L1", &[("p1", 100)])], &[("a", 1_000)]);
    let mut state = open(&mut Catalog::new(&seed.lots))?;
    let finalizer = SaleFinalizer::new(3);

    finalizer.advance(&mut state, &raise("a", 100))?;
    for _ in 0..2 {
        assert_eq!(finalizer.advance(&mut state, &RoundOutcome::NoRaise)?, Advance::Continue);
    }
    assert!(finalizer
        .advance(&mut state, &RoundOutcome::NoRaise)?
        .is_terminal());

    // zero would close before anyone could bid twice
    assert_eq!(SaleFinalizer::new(0).round_limit(), 1);
    Ok(())
}

#[test]
fn non_increasing_raise_is_fatal() -> Result<()> {
    let seed = seed(&[("L1", &[("p1", 100)])], &[("a", 1_000)]);
    let mut state = open(&mut Catalog::new(&seed.lots))?;
    let finalizer = SaleFinalizer::default();

    assert!(matches!(
        finalizer.advance(&mut state, &raise("a", 99)),
        Err(InvariantViolation::BelowReserve { .. })
    ));
    finalizer.advance(&mut state, &raise("a", 150))?;
    assert!(matches!(
        finalizer.advance(&mut state, &raise("b", 150)),
        Err(InvariantViolation::NonIncreasingBid { current: 150, .. })
    ));
    assert_eq!(state.highest_bid, Some(BidDetails::new("a", 150)));
    Ok(())
}

#[test]
fn settle_applies_a_sale() -> Result<()> {
    let seed = seed(&[("L1", &[("p1", 100)])], &[("a", 1_000)]);
    let mut catalog = Catalog::new(&seed.lots);
    let mut ledger = Ledger::new(&seed.bidders);
    let state = open(&mut catalog)?;

    let sold = Advance::Sold {
        bidder: "a".into(),
        amount: 400,
    };
    SaleFinalizer::default().settle(&state, &sold, &mut catalog, &mut ledger)?;

    assert_eq!(
        catalog.item("p1").map(|item| item.disposition),
        Some(Disposition::Sold)
    );
    assert_eq!(ledger.bidder("a").map(|a| a.remaining), Some(600));

    // a second settlement of the same item is refused
    assert_eq!(
        SaleFinalizer::default().settle(&state, &sold, &mut catalog, &mut ledger),
        Err(InvariantViolation::AlreadyFinalized { item: "p1".into() })
    );
    assert_eq!(ledger.bidder("a").map(|a| a.remaining), Some(600));
    Ok(())
}

#[test]
fn settle_refuses_overspend_and_leaves_state_intact() -> Result<()> {
    let seed = seed(&[("L1", &[("p1", 100)])], &[("a", 300)]);
    let mut catalog = Catalog::new(&seed.lots);
    let mut ledger = Ledger::new(&seed.bidders);
    let state = open(&mut catalog)?;

    let result = SaleFinalizer::default().settle(
        &state,
        &Advance::Sold {
            bidder: "a".into(),
            amount: 301,
        },
        &mut catalog,
        &mut ledger,
    );

    assert!(matches!(result, Err(InvariantViolation::Overspend { .. })));
    assert_eq!(
        catalog.item("p1").map(|item| item.disposition),
        Some(Disposition::Active)
    );
    assert_eq!(ledger.bidder("a").map(|a| a.remaining), Some(300));
    Ok(())
}

#[test]
fn settle_records_unsold_items() -> Result<()> {
    let seed = seed(&[("L1", &[("p1", 100)])], &[("a", 300)]);
    let mut catalog = Catalog::new(&seed.lots);
    let mut ledger = Ledger::new(&seed.bidders);
    let state = open(&mut catalog)?;

    SaleFinalizer::default().settle(&state, &Advance::Unsold, &mut catalog, &mut ledger)?;

    assert_eq!(ledger.unsold(), ["p1".to_owned()]);
    assert!(catalog.lot("L1").map(|lot| lot.is_complete()).unwrap_or(false));
    Ok(())
}
