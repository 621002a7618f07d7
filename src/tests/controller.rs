use super::{all_events, controller, seed, RandomDecider, ScriptedDecider};
use crate::{
    auction::{ActiveAuction, Disposition},
    config::AuctionConfig,
    decision::{Decision, HeuristicDecider},
    event::{BidRejection, Event},
    narrative::TemplateNarrator,
    observer::{AuctionResult, Status},
    ledger::RETAINED_LOT,
    seed::{RetainedSeed, Seed, SeedError},
};
use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::Arc;

fn three_bidders() -> Seed {
    seed(
        &[("L1", &[("p1", 200)])],
        &[("A", 1_000), ("B", 1_000), ("C", 1_000)],
    )
}

#[test]
fn highest_raise_wins_after_two_silent_rounds() -> Result<()> {
    let decider = Arc::new(
        ScriptedDecider::new()
            .script("A", [Decision::Raise(200)])
            .script("B", [Decision::Raise(210)])
            .script("C", [Decision::Raise(215)]),
    );
    let (mut controller, events) =
        controller(&three_bidders(), &AuctionConfig::default(), decider.clone())?;

    assert!(controller.step_item()?.is_continue());

    // the leader is never asked to outbid itself
    assert_eq!(decider.called_bidders(), ["A", "B", "A", "C", "A", "C"]);
    assert_eq!(
        all_events(&events)?,
        vec![
            Event::ItemOpened {
                item: "p1".into(),
                lot: "L1".into(),
                reserve: 200
            },
            Event::RaiseAccepted {
                item: "p1".into(),
                bidder: "A".into(),
                amount: 200
            },
            Event::RaiseAccepted {
                item: "p1".into(),
                bidder: "B".into(),
                amount: 210
            },
            Event::BidRejected {
                item: "p1".into(),
                bidder: "C".into(),
                reason: BidRejection::BelowMinimum {
                    amount: 215,
                    minimum: 220
                }
            },
            Event::RoundClosed {
                item: "p1".into(),
                round: 1
            },
            Event::RoundClosed {
                item: "p1".into(),
                round: 2
            },
            Event::Sold {
                item: "p1".into(),
                bidder: "B".into(),
                amount: 210
            },
            Event::LotCompleted { lot: "L1".into() },
        ]
    );

    let ledger = controller.ledger();
    assert_eq!(ledger.bidder("B").map(|b| b.remaining), Some(790));
    assert_eq!(ledger.bidder("A").map(|a| a.remaining), Some(1_000));
    assert_eq!(
        controller.catalog().item("p1").map(|item| item.disposition),
        Some(Disposition::Sold)
    );
    assert_eq!(controller.active(), &ActiveAuction::NoActiveItem);

    assert!(controller.step_item()?.is_break());
    assert_eq!(controller.status(), Status::Complete);
    assert_eq!(all_events(&events)?.last(), Some(&Event::AuctionComplete));
    Ok(())
}

#[test]
fn unaffordable_item_goes_unsold_without_asking_anyone() -> Result<()> {
    let seed = seed(&[("L1", &[("p1", 500)])], &[("A", 400), ("B", 300)]);
    let decider = Arc::new(ScriptedDecider::new().script("A", [Decision::Raise(500)]));
    let (mut controller, events) = controller(&seed, &AuctionConfig::default(), decider.clone())?;

    let result = controller.run_to_completion()?;

    assert!(decider.calls().is_empty());
    assert_eq!(result.unsold, ["p1".to_owned()]);
    assert!(result.purchases.is_empty());
    assert_eq!(controller.ledger().bidder("A").map(|a| a.remaining), Some(400));
    assert_eq!(
        all_events(&events)?,
        vec![
            Event::ItemOpened {
                item: "p1".into(),
                lot: "L1".into(),
                reserve: 500
            },
            Event::RoundClosed {
                item: "p1".into(),
                round: 1
            },
            Event::Unsold { item: "p1".into() },
            Event::LotCompleted { lot: "L1".into() },
            Event::AuctionComplete,
        ]
    );
    Ok(())
}

#[test]
fn retained_items_count_against_the_budget() -> Result<()> {
    let mut seed = seed(&[("L1", &[("p1", 500)])], &[("A", 1_000), ("B", 300)]);
    seed.bidders[0].retained.push(RetainedSeed {
        item: "k1".into(),
        amount: 700,
    });
    let decider = Arc::new(ScriptedDecider::new().script("A", [Decision::Raise(500)]));
    let (mut controller, _events) = controller(&seed, &AuctionConfig::default(), decider.clone())?;

    let result = controller.run_to_completion()?;

    assert!(decider.calls().is_empty());
    assert_eq!(result.unsold, ["p1".to_owned()]);
    assert_eq!(result.purchases.len(), 1);
    assert_eq!(result.purchases[0].item, "k1");
    assert_eq!(result.purchases[0].lot, RETAINED_LOT);
    assert_eq!(controller.ledger().bidder("A").map(|a| a.remaining), Some(300));
    Ok(())
}

#[test]
fn leader_may_bid_again_when_exclusion_is_off() -> Result<()> {
    let seed = seed(&[("L1", &[("p1", 100)])], &[("A", 1_000), ("B", 1_000)]);
    let decider = Arc::new(
        ScriptedDecider::new().script("A", [Decision::NormalRaise, Decision::NormalRaise]),
    );
    let config = AuctionConfig {
        exclude_current_leader: false,
        ..AuctionConfig::default()
    };
    let (mut controller, _events) = controller(&seed, &config, decider.clone())?;

    let result = controller.run_to_completion()?;

    // A raises itself once: 100, then 110
    assert_eq!(result.purchases.len(), 1);
    assert_eq!(result.purchases[0].bidder, "A");
    assert_eq!(result.purchases[0].amount, 110);
    assert_eq!(decider.called_bidders()[..2], ["A".to_owned(), "A".to_owned()]);
    Ok(())
}

#[test]
fn sale_narrative_lands_in_the_result() -> Result<()> {
    let seed = seed(&[("L1", &[("p1", 100)])], &[("A", 1_000)]);
    let decider = Arc::new(ScriptedDecider::new().script("A", [Decision::NormalRaise]));
    let (controller, events) = controller(&seed, &AuctionConfig::default(), decider)?;
    let mut controller = controller.with_narrator(Arc::new(TemplateNarrator));

    let result = controller.run_to_completion()?;

    let text = result.narratives.get("p1").cloned().unwrap_or_default();
    assert!(text.starts_with("A bought p1 from lot L1 for 100"));
    assert!(all_events(&events)?.contains(&Event::Narrative {
        item: "p1".into(),
        text,
    }));
    Ok(())
}

#[test]
fn observer_follows_the_controller() -> Result<()> {
    let seed = seed(
        &[("L1", &[("p1", 100), ("p2", 100)]), ("L2", &[("p3", 100)])],
        &[("A", 1_000), ("B", 1_000)],
    );
    let decider = Arc::new(
        ScriptedDecider::new()
            .script("A", [Decision::NormalRaise])
            .script("B", [Decision::Pass, Decision::Pass, Decision::RaiseBy(50)]),
    );
    let (mut controller, _events) = controller(&seed, &AuctionConfig::default(), decider)?;
    let observer = controller.observer();

    let initial = observer.snapshot();
    assert_eq!(initial.status, Status::Running);
    assert_eq!(initial.progress.items_pending, 3);
    assert!(initial.active_item.is_none());
    assert!(observer.result().is_none());

    controller.step_item()?;
    let snapshot = observer.snapshot();
    assert_eq!(snapshot, controller.snapshot());
    assert_eq!(snapshot.progress.items_sold, 1);
    assert_eq!(snapshot.progress.items_pending, 2);
    assert_eq!(snapshot.bidders[0].spent, 100);

    let result = controller.run_to_completion()?;
    assert_eq!(observer.snapshot().status, Status::Complete);
    assert_eq!(observer.result(), Some(result.clone()));
    assert_eq!(observer.snapshot().progress.lots_completed, 2);

    // p2: B adds 50 on top of the 100 reserve
    let by_item: BTreeMap<_, _> = result
        .purchases
        .iter()
        .map(|row| (row.item.as_str(), (row.bidder.as_str(), row.amount)))
        .collect();
    assert_eq!(by_item.get("p1"), Some(&("A", 100)));
    assert_eq!(by_item.get("p2"), Some(&("B", 150)));
    assert_eq!(result.unsold, ["p3".to_owned()]);
    Ok(())
}

#[test]
fn invalid_seed_is_refused_up_front() {
    let mut seed = three_bidders();
    seed.bidders.push(seed.bidders[0].clone());

    let res = controller(
        &seed,
        &AuctionConfig::default(),
        Arc::new(ScriptedDecider::new()),
    );

    assert_eq!(
        res.err()
            .and_then(|e| e.downcast_ref::<SeedError>().cloned()),
        Some(SeedError::DuplicateBidder("A".into()))
    );
}

fn run_heuristic(seed: &Seed, rng_seed: u64) -> Result<(AuctionResult, Vec<Event>)> {
    let (mut controller, events) = controller(
        seed,
        &AuctionConfig::default(),
        Arc::new(HeuristicDecider::seeded(rng_seed)),
    )?;
    let result = controller.run_to_completion()?;
    Ok((result, all_events(&events)?))
}

fn league() -> Seed {
    seed(
        &[
            ("batters", &[("b1", 200), ("b2", 150), ("b3", 100)]),
            ("bowlers", &[("w1", 200), ("w2", 120)]),
            ("keepers", &[("k1", 80)]),
        ],
        &[("A", 2_000), ("B", 1_500), ("C", 1_200), ("D", 900)],
    )
}

#[test]
fn same_inputs_same_auction() -> Result<()> {
    let seed = league();

    let (first, first_events) = run_heuristic(&seed, 42)?;
    let (second, second_events) = run_heuristic(&seed, 42)?;

    assert_eq!(first, second);
    assert_eq!(first_events, second_events);
    Ok(())
}

#[test]
fn random_bidding_never_breaks_the_books() -> Result<()> {
    let seed = league();
    let items: Vec<_> = seed
        .lots
        .iter()
        .flat_map(|lot| lot.items.iter().map(|item| item.id.clone()))
        .collect();

    for rng_seed in 0..40 {
        let config = AuctionConfig {
            round_limit: 1 + (rng_seed % 3) as u8,
            exclude_current_leader: rng_seed % 2 == 0,
            ..AuctionConfig::default()
        };
        let (mut controller, events) =
            controller(&seed, &config, Arc::new(RandomDecider::seeded(rng_seed)))?;
        let result = controller.run_to_completion()?;
        let events = all_events(&events)?;

        assert_eq!(controller.status(), Status::Complete);
        controller.ledger().check_balances()?;

        for item in &items {
            let opened = events
                .iter()
                .filter(|e| matches!(e, Event::ItemOpened { item: i, .. } if i == item))
                .count();
            let closed = events
                .iter()
                .filter(|e| {
                    matches!(e, Event::Sold { item: i, .. } | Event::Unsold { item: i } if i == item)
                })
                .count();
            assert_eq!((opened, closed), (1, 1), "item {} (seed {})", item, rng_seed);
            assert!(controller
                .catalog()
                .item(item)
                .map(|item| item.disposition.is_final())
                .unwrap_or(false));
        }

        for bidder in &result.bidders {
            assert!(bidder.spent <= bidder.starting_budget);
            assert_eq!(bidder.spent + bidder.remaining, bidder.starting_budget);
        }
        assert_eq!(result.purchases.len() + result.unsold.len(), items.len());

        for purchase in &result.purchases {
            let reserve = controller
                .catalog()
                .item(&purchase.item)
                .map(|item| item.reserve)
                .unwrap_or_default();
            assert!(purchase.amount >= reserve);
        }
    }
    Ok(())
}

#[test]
fn finished_controller_ignores_further_steps() -> Result<()> {
    let seed = seed(&[("L1", &[("p1", 100)])], &[("A", 1_000)]);
    let (mut controller, events) = controller(
        &seed,
        &AuctionConfig::default(),
        Arc::new(ScriptedDecider::new()),
    )?;
    controller.run_to_completion()?;
    let before = all_events(&events)?.len();

    assert!(controller.step_item()?.is_break());
    assert_eq!(all_events(&events)?.len(), before);
    Ok(())
}
