//! The per-market call-auction matcher.
//!
//! A [`Matcher`] accumulates every open order of one market for one block,
//! then clears them all at a single uniform price:
//!
//! ```text
//! enqueue_order(..) * N  ->  match_orders() -> Option<MatchResult>
//! ```
//!
//! The matcher has no side effects. It never touches balances or storage;
//! the settlement pipeline applies the fills it returns.

use blockclear_types::{Direction, Fill, MatchResult, OrderId, Price, PriceLevelVolume, Quantity};

use crate::{OrderBook, PriceLevel, clearing::compute_clearing_price};

/// Matching engine for one market.
#[derive(Debug, Default)]
pub struct Matcher {
    book: OrderBook,
}

impl Matcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an order behind everything already enqueued at its price.
    ///
    /// Callers guarantee `price > 0` and `quantity > 0`.
    pub fn enqueue_order(
        &mut self,
        direction: Direction,
        order_id: OrderId,
        price: Price,
        quantity: Quantity,
    ) {
        self.book.insert(direction, order_id, price, quantity);
    }

    /// Clear the book at one uniform price.
    ///
    /// Returns `None` when no bid crosses any ask. Otherwise every bid priced
    /// at or above the clearing price and every ask at or below it is filled
    /// in price-time priority until the matched volume is used up on each
    /// side. Only orders with a nonzero fill are listed.
    #[must_use]
    pub fn match_orders(&self) -> Option<MatchResult> {
        let clearing = compute_clearing_price(&self.book)?;
        let price = clearing.price;

        let mut fills = Vec::new();
        allocate(
            Direction::Bid,
            self.book.bid_levels().take_while(|l| l.price >= price),
            clearing.volume,
            &mut fills,
        );
        allocate(
            Direction::Ask,
            self.book.ask_levels().take_while(|l| l.price <= price),
            clearing.volume,
            &mut fills,
        );

        let result = MatchResult {
            clearing_price: price,
            matched_volume: clearing.volume,
            bid_aggregates: aggregate(self.book.bid_levels()),
            ask_aggregates: aggregate(self.book.ask_levels()),
            fills,
        };

        tracing::debug!(
            clearing_price = %result.clearing_price,
            matched_volume = %result.matched_volume,
            bid_levels = self.book.bid_depth(),
            ask_levels = self.book.ask_depth(),
            fills = result.fills.len(),
            "Book cleared"
        );

        Some(result)
    }

    /// Drop every enqueued order.
    pub fn reset(&mut self) {
        self.book.clear();
    }

    #[must_use]
    pub fn order_count(&self) -> usize {
        self.book.order_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.book.is_empty()
    }
}

/// Hand out `volume` to entries in iteration order.
fn allocate<'a>(
    direction: Direction,
    levels: impl Iterator<Item = &'a PriceLevel>,
    volume: Quantity,
    fills: &mut Vec<Fill>,
) {
    let mut remaining = volume;
    for entry in levels.flat_map(PriceLevel::iter) {
        if remaining.is_zero() {
            break;
        }
        let qty_filled = entry.quantity.min(remaining);
        remaining = remaining.saturating_sub(qty_filled);
        fills.push(Fill {
            order_id: entry.order_id,
            direction,
            qty_filled,
            qty_unfilled: entry.quantity.saturating_sub(qty_filled),
        });
    }
}

fn aggregate<'a>(levels: impl Iterator<Item = &'a PriceLevel>) -> Vec<PriceLevelVolume> {
    levels
        .map(|l| PriceLevelVolume {
            price: l.price,
            quantity: l.total_quantity(),
        })
        .collect()
}
