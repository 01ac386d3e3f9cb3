//! Market registry.

use std::collections::BTreeMap;

use blockclear_types::{BlockclearError, Market, MarketId, MarketRegistry, Result};

/// Markets keyed by ascending id. Ids start at 1.
#[derive(Debug, Default)]
pub struct MarketDirectory {
    markets: BTreeMap<MarketId, Market>,
    last_id: MarketId,
}

impl MarketDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a market for `base/quote` and return its id.
    ///
    /// # Errors
    /// `InvalidMarket` if a denomination is empty or both are the same.
    pub fn create_market(&mut self, base: &str, quote: &str) -> Result<MarketId> {
        if base.is_empty() || quote.is_empty() {
            return Err(BlockclearError::InvalidMarket {
                reason: "denominations must be non-empty".into(),
            });
        }
        if base == quote {
            return Err(BlockclearError::InvalidMarket {
                reason: format!("base and quote are both {base}"),
            });
        }
        let id = self.last_id.next();
        self.last_id = id;
        let market = Market::new(id, base, quote);
        tracing::info!(market_id = %id, symbol = %market.symbol(), "Market created");
        self.markets.insert(id, market);
        Ok(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.markets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}

impl MarketRegistry for MarketDirectory {
    fn get(&self, id: MarketId) -> Result<Market> {
        self.markets
            .get(&id)
            .cloned()
            .ok_or(BlockclearError::MarketNotFound(id))
    }
}
