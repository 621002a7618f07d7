use super::*;
use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Rule-of-thumb bidder used when no smarter collaborator is wired in
///
/// Always raises by a single increment, and only while the price stays
/// within a share of the remaining budget and a multiple of the
/// reserve. A seeded coin flip adds hesitation.
pub struct HeuristicDecider {
    rng: Mutex<StdRng>,
    /// Out of 100
    pub budget_share_pct: u64,
    pub reserve_multiple: u64,
    pub hesitation: f64,
}

impl HeuristicDecider {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            budget_share_pct: 30,
            reserve_multiple: 15,
            hesitation: 0.5,
        }
    }

    fn interested(&self, context: &BidContext) -> bool {
        let price = context.current_price();
        let remaining = context.bidder.remaining;

        remaining > 0
            && context.minimum_bid <= remaining
            && price.saturating_mul(100) <= remaining.saturating_mul(self.budget_share_pct)
            && price <= context.item.reserve.saturating_mul(self.reserve_multiple)
    }
}

impl BidDecider for HeuristicDecider {
    fn decide(&self, context: &BidContext) -> Result<Decision, DecisionError> {
        if !self.interested(context) {
            return Ok(Decision::Pass);
        }
        if self.rng.lock().gen_bool(self.hesitation.clamp(0.0, 1.0)) {
            return Ok(Decision::Pass);
        }
        Ok(Decision::NormalRaise)
    }
}
