//! Sale narrative collaborator
//!
//! Explains a completed sale. Purely observational: the text ends up
//! in the event log and the final result, nothing else.
use crate::auction::{Amount, Item};
use crate::ledger::BidderAccount;
use anyhow::Result;
use std::sync::Arc;

pub struct SaleContext<'a> {
    pub item: &'a Item,
    pub winner: &'a BidderAccount,
    pub amount: Amount,
}

pub trait SaleNarrator: Send + Sync {
    fn explain(&self, context: &SaleContext<'_>) -> Result<String>;
}

pub type SharedSaleNarrator = Arc<dyn SaleNarrator + 'static>;

/// Plain template narrator
pub struct TemplateNarrator;

impl SaleNarrator for TemplateNarrator {
    fn explain(&self, context: &SaleContext<'_>) -> Result<String> {
        let SaleContext {
            item,
            winner,
            amount,
        } = context;
        let premium = amount.saturating_sub(item.reserve);
        Ok(format!(
            "{} bought {} from lot {} for {} ({} over a reserve of {}), leaving {} in the purse with {} in the squad",
            winner.id,
            item.id,
            item.lot,
            amount,
            premium,
            item.reserve,
            winner.remaining,
            winner.squad.len(),
        ))
    }
}
