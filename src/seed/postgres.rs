use super::*;
use anyhow::format_err;
use r2d2_postgres::{postgres::NoTls, PostgresConnectionManager};
use tracing::info;

pub type PostgresPool = r2d2::Pool<PostgresConnectionManager<NoTls>>;

/// Reads the catalog from `lots`, `items` and `bidders` tables,
/// plus pre-auction holdings from `retained`
///
/// Each table carries a `position` column that fixes catalog
/// (and intra-lot) order.
#[derive(Clone)]
pub struct PostgresSeedSource {
    pool: PostgresPool,
}

impl PostgresSeedSource {
    pub fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }

    pub fn connect(url: &str) -> Result<Self> {
        let manager = PostgresConnectionManager::new(url.parse()?, NoTls);
        Ok(Self::new(r2d2::Pool::new(manager)?))
    }
}

impl SeedSource for PostgresSeedSource {
    fn load(&self) -> Result<Seed> {
        let mut conn = self.pool.get()?;

        let mut lots: Vec<LotSeed> = conn
            .query("SELECT id FROM lots ORDER BY position", &[])?
            .iter()
            .map(|row| LotSeed {
                id: row.get("id"),
                items: vec![],
            })
            .collect();
        let lot_index: BTreeMap<LotId, usize> = lots
            .iter()
            .enumerate()
            .map(|(i, lot)| (lot.id.clone(), i))
            .collect();

        for row in conn.query(
            "SELECT id, lot_id, reserve, attributes FROM items ORDER BY position",
            &[],
        )? {
            let id: ItemId = row.get("id");
            let lot: LotId = row.get("lot_id");
            let attributes = match row.get::<_, Option<String>>("attributes") {
                Some(json) => serde_json::from_str(&json)?,
                None => BTreeMap::new(),
            };
            let i = *lot_index
                .get(&lot)
                .ok_or_else(|| format_err!("item {} references unknown lot {}", id, lot))?;
            lots[i].items.push(ItemSeed {
                id,
                lot: Some(lot),
                reserve: u64::try_from(row.get::<_, i64>("reserve"))?,
                attributes,
            });
        }

        let mut bidders = conn
            .query("SELECT id, starting_budget FROM bidders ORDER BY position", &[])?
            .iter()
            .map(|row| -> Result<BidderSeed> {
                Ok(BidderSeed {
                    id: row.get("id"),
                    starting_budget: u64::try_from(row.get::<_, i64>("starting_budget"))?,
                    retained: vec![],
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let bidder_index: BTreeMap<BidderId, usize> = bidders
            .iter()
            .enumerate()
            .map(|(i, bidder)| (bidder.id.clone(), i))
            .collect();

        for row in conn.query(
            "SELECT bidder_id, item_id, amount FROM retained ORDER BY position",
            &[],
        )? {
            let bidder: BidderId = row.get("bidder_id");
            let item: ItemId = row.get("item_id");
            let i = *bidder_index.get(&bidder).ok_or_else(|| {
                format_err!("retained item {} references unknown bidder {}", item, bidder)
            })?;
            bidders[i].retained.push(RetainedSeed {
                item,
                amount: u64::try_from(row.get::<_, i64>("amount"))?,
            });
        }

        let seed = Seed { lots, bidders };
        seed.validate()?;
        info!(
            lots = seed.lots.len(),
            bidders = seed.bidders.len(),
            "seed loaded from postgres"
        );
        Ok(seed)
    }
}
