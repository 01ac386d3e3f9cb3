//! Market definition: a base/quote trading pair.

use serde::{Deserialize, Serialize};

use crate::MarketId;

/// Type alias for asset denominations (e.g., "tst1", "uftm").
pub type Asset = String;

/// A spot market. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub base_asset_denom: Asset,
    pub quote_asset_denom: Asset,
}

impl Market {
    #[must_use]
    pub fn new(id: MarketId, base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            id,
            base_asset_denom: base.into(),
            quote_asset_denom: quote.into(),
        }
    }

    /// Pair symbol, e.g. `tst1/tst2`.
    #[must_use]
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.base_asset_denom, self.quote_asset_denom)
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.id, self.symbol())
    }
}
