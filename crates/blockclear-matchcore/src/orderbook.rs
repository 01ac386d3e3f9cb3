//! The book one matcher accumulates for a single market.
//!
//! Uses `BTreeMap` for price-level ordering:
//! - **Bids**: `BTreeMap<Reverse<Price>, PriceLevel>` -- highest price first
//! - **Asks**: `BTreeMap<Price, PriceLevel>` -- lowest price first
//!
//! Within a level, entries keep enqueue order, so iterating levels and then
//! entries walks each side in strict price-time priority.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use blockclear_types::{Direction, OrderId, Price, Quantity};

use crate::price_level::PriceLevel;

/// Price-ordered bids and asks for one market.
#[derive(Debug, Default)]
pub struct OrderBook {
    /// Buy side: highest price first (`Reverse` key).
    bids: BTreeMap<Reverse<Price>, PriceLevel>,
    /// Sell side: lowest price first.
    asks: BTreeMap<Price, PriceLevel>,
    /// Entries across both sides.
    count: usize,
}

impl OrderBook {
    /// Create a new empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =================================================================
    // Insertion
    // =================================================================

    /// Append an entry at the back of its price level.
    pub fn insert(&mut self, direction: Direction, order_id: OrderId, price: Price, quantity: Quantity) {
        match direction {
            Direction::Bid => {
                self.bids
                    .entry(Reverse(price))
                    .or_insert_with(|| PriceLevel::new(price))
                    .push_back(order_id, quantity);
            }
            Direction::Ask => {
                self.asks
                    .entry(price)
                    .or_insert_with(|| PriceLevel::new(price))
                    .push_back(order_id, quantity);
            }
        }
        self.count += 1;
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Best (highest) bid price, or `None` if no bids.
    #[must_use]
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.keys().next().map(|r| r.0)
    }

    /// Best (lowest) ask price, or `None` if no asks.
    #[must_use]
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.keys().next().copied()
    }

    /// Total number of entries in the book.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.count
    }

    /// Number of distinct bid price levels.
    #[must_use]
    pub fn bid_depth(&self) -> usize {
        self.bids.len()
    }

    /// Number of distinct ask price levels.
    #[must_use]
    pub fn ask_depth(&self) -> usize {
        self.asks.len()
    }

    /// Returns `true` if the book has no entries on either side.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    // =================================================================
    // Iteration (for clearing and allocation)
    // =================================================================

    /// Iterate bid levels from best (highest) to worst.
    pub fn bid_levels(&self) -> impl DoubleEndedIterator<Item = &PriceLevel> {
        self.bids.values()
    }

    /// Iterate ask levels from best (lowest) to worst.
    pub fn ask_levels(&self) -> impl DoubleEndedIterator<Item = &PriceLevel> {
        self.asks.values()
    }

    // =================================================================
    // Maintenance
    // =================================================================

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.count = 0;
    }
}
