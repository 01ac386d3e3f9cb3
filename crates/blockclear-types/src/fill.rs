//! Matcher output: fills and per-market match results.
//!
//! Both are ephemeral. They live for one block, between the clearing pass
//! and settlement, and are never persisted.

use serde::{Deserialize, Serialize};

use crate::{Direction, OrderId, Price, Quantity};

/// Allocation to a single order at the clearing price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: OrderId,
    pub direction: Direction,
    pub qty_filled: Quantity,
    /// What is left of the order after this fill.
    pub qty_unfilled: Quantity,
}

impl Fill {
    /// Order quantity before the match, `qty_filled + qty_unfilled`.
    #[must_use]
    pub fn original_quantity(&self) -> Option<Quantity> {
        self.qty_filled.checked_add(self.qty_unfilled)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.qty_unfilled.is_zero()
    }
}

/// Total resting quantity at one price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceLevelVolume {
    pub price: Price,
    pub quantity: Quantity,
}

/// Outcome of clearing one market for one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// The uniform price every fill executes at.
    pub clearing_price: Price,
    /// Base quantity executed on each side.
    pub matched_volume: Quantity,
    /// Bid levels, best (highest) first.
    pub bid_aggregates: Vec<PriceLevelVolume>,
    /// Ask levels, best (lowest) first.
    pub ask_aggregates: Vec<PriceLevelVolume>,
    /// Bids first, then asks, each in price-time priority.
    pub fills: Vec<Fill>,
}

impl MatchResult {
    /// Sum of `qty_filled` over fills on one side.
    #[must_use]
    pub fn filled_on(&self, direction: Direction) -> Quantity {
        Quantity::from_units(
            self.fills
                .iter()
                .filter(|f| f.direction == direction)
                .map(|f| f.qty_filled.units())
                .sum(),
        )
    }
}
