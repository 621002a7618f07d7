use super::ScriptedDecider;
use crate::{
    auction::{AuctionState, BidDetails, Disposition, Item},
    decision::{Decision, DecisionError},
    event::BidRejection,
    increment::IncrementPolicy,
    ledger::BidderAccount,
    round::{BidRound, RoundOutcome},
};
use std::collections::BTreeMap;

fn item(reserve: u64) -> Item {
    Item {
        id: "p1".into(),
        lot: "L1".into(),
        reserve,
        attributes: BTreeMap::new(),
        highest_bid: None,
        disposition: Disposition::Active,
    }
}

fn account(id: &str, registration: usize, remaining: u64) -> BidderAccount {
    BidderAccount {
        id: id.into(),
        registration,
        starting_budget: remaining,
        remaining,
        squad: vec![],
    }
}

fn run(
    decider: &ScriptedDecider,
    state: &AuctionState,
    item: &Item,
    bidders: &[BidderAccount],
) -> crate::round::RoundReport {
    let policy = IncrementPolicy::default();
    let round = BidRound {
        policy: &policy,
        decider,
        remaining_lots: vec![],
    };
    let bidders: Vec<_> = bidders.iter().collect();
    round.run(state, item, &bidders)
}

#[test]
fn first_valid_raise_ends_the_round() {
    let decider = ScriptedDecider::new()
        .script("a", [Decision::Pass])
        .script("b", [Decision::Raise(200)])
        .script("c", [Decision::Raise(500)]);
    let item = item(200);
    let state = AuctionState::new(&item);
    let bidders = [account("a", 0, 1_000), account("b", 1, 1_000), account("c", 2, 1_000)];

    let report = run(&decider, &state, &item, &bidders);

    assert_eq!(report.outcome, RoundOutcome::Raise(BidDetails::new("b", 200)));
    assert_eq!(report.consulted, vec!["a", "b"]);
    assert_eq!(decider.called_bidders(), vec!["a", "b"]);
    assert!(report.rejections.is_empty());
}

#[test]
fn illegal_and_broken_responses_count_as_passes() {
    let decider = ScriptedDecider::new()
        .script("a", [Decision::Raise(205)])
        .script("b", [Decision::Raise(260)])
        .fail("c", DecisionError::Malformed("not json".into()))
        .fail("d", DecisionError::Unavailable("connection refused".into()));
    let item = item(100);
    let mut state = AuctionState::new(&item);
    state.highest_bid = Some(BidDetails::new("z", 200));
    let bidders = [
        account("a", 0, 1_000),
        account("b", 1, 250),
        account("c", 2, 1_000),
        account("d", 3, 1_000),
    ];

    let report = run(&decider, &state, &item, &bidders);

    assert_eq!(report.outcome, RoundOutcome::NoRaise);
    assert_eq!(report.consulted, vec!["a", "b", "c", "d"]);
    assert_eq!(
        report.rejections,
        vec![
            (
                "a".to_owned(),
                BidRejection::BelowMinimum {
                    amount: 205,
                    minimum: 210
                }
            ),
            (
                "b".to_owned(),
                BidRejection::OverBudget {
                    amount: 260,
                    remaining: 250
                }
            ),
            (
                "c".to_owned(),
                BidRejection::Malformed("not json".into())
            ),
            (
                "d".to_owned(),
                BidRejection::Unavailable("connection refused".into())
            ),
        ]
    );
}

#[test]
fn a_rejected_raise_does_not_stop_later_bidders() {
    let decider = ScriptedDecider::new()
        .script("a", [Decision::Raise(10_000)])
        .script("b", [Decision::NormalRaise]);
    let item = item(300);
    let state = AuctionState::new(&item);
    let bidders = [account("a", 0, 500), account("b", 1, 500)];

    let report = run(&decider, &state, &item, &bidders);

    // no bid yet: a normal raise is the reserve itself
    assert_eq!(report.outcome, RoundOutcome::Raise(BidDetails::new("b", 300)));
    assert_eq!(report.rejections.len(), 1);
}

#[test]
fn custom_raises_add_to_the_current_price() {
    let decider = ScriptedDecider::new().script("a", [Decision::RaiseBy(40)]);
    let item = item(100);
    let mut state = AuctionState::new(&item);
    state.highest_bid = Some(BidDetails::new("z", 150));

    let report = run(&decider, &state, &item, &[account("a", 0, 1_000)]);

    assert_eq!(report.outcome, RoundOutcome::Raise(BidDetails::new("a", 190)));
    assert_eq!(decider.calls()[0].minimum, 160);
}

#[test]
fn no_bidders_means_no_raise() {
    let decider = ScriptedDecider::new();
    let item = item(500);
    let state = AuctionState::new(&item);

    let report = run(&decider, &state, &item, &[]);

    assert_eq!(report.outcome, RoundOutcome::NoRaise);
    assert!(report.consulted.is_empty());
    assert!(decider.calls().is_empty());
}
