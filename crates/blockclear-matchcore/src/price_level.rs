//! A single price level in a matcher's book.
//!
//! Entries at the same price are kept in enqueue order (time priority)
//! using a [`VecDeque`].

use std::collections::VecDeque;

use blockclear_types::{OrderId, Price, Quantity};

/// One enqueued order as the matcher sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelEntry {
    pub order_id: OrderId,
    pub quantity: Quantity,
}

/// All entries resting at one price.
///
/// The front of the deque was enqueued first and is allocated first.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    /// The price at this level.
    pub price: Price,
    /// Entries in time-priority order (front = earliest).
    pub entries: VecDeque<LevelEntry>,
}

impl PriceLevel {
    /// Create a new empty price level.
    #[must_use]
    pub fn new(price: Price) -> Self {
        Self {
            price,
            entries: VecDeque::new(),
        }
    }

    /// Add an entry to the back of this level (lowest time priority).
    pub fn push_back(&mut self, order_id: OrderId, quantity: Quantity) {
        self.entries.push_back(LevelEntry { order_id, quantity });
    }

    /// Total quantity across all entries at this level.
    #[must_use]
    pub fn total_quantity(&self) -> Quantity {
        Quantity::from_units(
            self.entries
                .iter()
                .fold(0u128, |acc, e| acc.saturating_add(e.quantity.units())),
        )
    }

    /// Iterate entries in time priority.
    pub fn iter(&self) -> impl Iterator<Item = &LevelEntry> {
        self.entries.iter()
    }

    /// Returns `true` if there are no entries at this level.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries at this level.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
