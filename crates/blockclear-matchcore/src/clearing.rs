//! Uniform clearing price computation for the per-block call auction.
//!
//! The clearing price maximizes executed volume. At a candidate price `p`:
//! - `demand(p)` = total bid quantity with price `>= p`
//! - `supply(p)` = total ask quantity with price `<= p`
//! - executable volume = `min(demand(p), supply(p))`
//!
//! Candidates are the distinct level prices inside the crossing range
//! `[best_ask, best_bid]`; volume is a step function that only changes at
//! those prices.
//!
//! Ties on volume are broken by the smallest `|demand - supply|`, then by
//! the lowest price. The lowest tied price is the ask-side boundary of the
//! range, so buyers priced above it are refunded the difference.

use std::collections::BTreeSet;

use blockclear_types::{Price, Quantity};

use crate::OrderBook;

/// Result of clearing price computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearingResult {
    /// The uniform clearing price.
    pub price: Price,
    /// Volume executed on each side at this price.
    pub volume: Quantity,
    /// Total bid quantity willing to pay at least `price`.
    pub demand: Quantity,
    /// Total ask quantity willing to accept at most `price`.
    pub supply: Quantity,
}

impl ClearingResult {
    fn imbalance(&self) -> u128 {
        self.demand.units().abs_diff(self.supply.units())
    }
}

/// Compute the uniform clearing price for a book.
///
/// Returns `None` when either side is empty or the best bid is below the
/// best ask.
#[must_use]
pub fn compute_clearing_price(book: &OrderBook) -> Option<ClearingResult> {
    let (best_bid, best_ask) = match (book.best_bid(), book.best_ask()) {
        (Some(bid), Some(ask)) if bid >= ask => (bid, ask),
        _ => return None,
    };

    let candidates: Vec<Price> = book
        .bid_levels()
        .map(|l| l.price)
        .filter(|p| *p >= best_ask)
        .chain(book.ask_levels().map(|l| l.price).filter(|p| *p <= best_bid))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    // Supply grows with price: sweep candidates upward over asks.
    let mut supply = Vec::with_capacity(candidates.len());
    let mut cum = 0u128;
    let mut asks = book.ask_levels().peekable();
    for &p in &candidates {
        while let Some(level) = asks.next_if(|l| l.price <= p) {
            cum = cum.saturating_add(level.total_quantity().units());
        }
        supply.push(cum);
    }

    // Demand shrinks with price: sweep candidates downward over bids.
    let mut demand = vec![0u128; candidates.len()];
    cum = 0;
    let mut bids = book.bid_levels().peekable();
    for (i, &p) in candidates.iter().enumerate().rev() {
        while let Some(level) = bids.next_if(|l| l.price >= p) {
            cum = cum.saturating_add(level.total_quantity().units());
        }
        demand[i] = cum;
    }

    let mut best: Option<ClearingResult> = None;
    for (i, &price) in candidates.iter().enumerate() {
        let candidate = ClearingResult {
            price,
            volume: Quantity::from_units(demand[i].min(supply[i])),
            demand: Quantity::from_units(demand[i]),
            supply: Quantity::from_units(supply[i]),
        };
        if candidate.volume.is_zero() {
            continue;
        }
        // Candidates ascend, so keeping the incumbent on a full tie keeps
        // the lower price.
        let is_better = match &best {
            None => true,
            Some(current) => {
                candidate.volume > current.volume
                    || (candidate.volume == current.volume
                        && candidate.imbalance() < current.imbalance())
            }
        };
        if is_better {
            best = Some(candidate);
        }
    }

    best
}
