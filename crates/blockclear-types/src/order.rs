//! Order types.
//!
//! An [`Order`] in storage always has a positive price and a positive
//! remaining quantity. Orders that fill completely are deleted, never kept
//! around with zero quantity.
//!
//! Each order carries the funds held back for it in `escrow`. Fills and
//! cancellations pay out of that balance, so nothing leaves escrow that was
//! not put in when the order was posted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    AccountId, Amount, BlockclearError, Market, MarketId, OrderId, Price, Quantity, Result,
    amount_ceil, notional,
};

/// Which side of the auction an order is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Direction {
    /// Buys base, pays quote.
    Bid,
    /// Sells base, receives quote.
    Ask,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bid => write!(f, "BID"),
            Self::Ask => write!(f, "ASK"),
        }
    }
}

/// Lifecycle status of an order that is still in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderStatus {
    Open,
    PartiallyFilled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
        }
    }
}

/// A resting limit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub owner: AccountId,
    pub market_id: MarketId,
    pub direction: Direction,
    /// Limit price, quote per base.
    pub price: Price,
    /// Remaining base quantity.
    pub quantity: Quantity,
    pub created_block: u64,
    pub created_time: DateTime<Utc>,
    pub time_in_force_blocks: u16,
    pub status: OrderStatus,
    /// Funds still held back: quote for bids, base for asks.
    #[serde(default)]
    pub escrow: Amount,
    /// Sum of `clearing_price * qty_filled` over earlier fills, unscaled.
    #[serde(default)]
    pub filled_notional: u128,
}

impl Order {
    /// `height - created_block > time_in_force_blocks`.
    ///
    /// An order whose creation height is ahead of `height` is never expired.
    #[must_use]
    pub fn is_expired_at(&self, height: u64) -> bool {
        height.saturating_sub(self.created_block) > u64::from(self.time_in_force_blocks)
    }

    /// The asset held in escrow while this order rests.
    #[must_use]
    pub fn escrow_asset<'m>(&self, market: &'m Market) -> &'m str {
        match self.direction {
            Direction::Bid => market.quote_asset_denom.as_str(),
            Direction::Ask => market.base_asset_denom.as_str(),
        }
    }

    /// Escrow that covers everything this order can still owe.
    ///
    /// An ask owes its remaining base. A bid pays for its fills by rounding
    /// its cumulative notional up, so it holds
    /// `ceil((filled_notional + price * quantity) / 10^8) - ceil(filled_notional / 10^8)`
    /// quote.
    pub fn required_escrow(&self) -> Result<Amount> {
        required_escrow(self.direction, self.price, self.quantity, self.filled_notional)
    }

    /// Take `qty_filled` off the order at `clearing_price` and shrink the
    /// escrow to what the remainder still needs.
    ///
    /// Returns the escrow released back to the owner as a refund. For an
    /// ask this is always zero; the base it gives up goes to the buyers.
    /// A bid is charged `ceil(filled_notional / 10^8)` in total over all of
    /// its fills, which is never less than the exact value it bought.
    ///
    /// The order is left unchanged on error.
    ///
    /// # Errors
    /// - `FillQuantityMismatch` if `qty_filled` exceeds the open quantity
    /// - `SupplyInvariantViolation` if the escrow cannot cover the fill
    /// - `ArithmeticOverflow`
    pub fn apply_fill(&mut self, clearing_price: Price, qty_filled: Quantity) -> Result<Amount> {
        let quantity =
            self.quantity
                .checked_sub(qty_filled)
                .ok_or_else(|| BlockclearError::FillQuantityMismatch {
                    order_id: self.id,
                    reason: format!("filled {qty_filled} of open {}", self.quantity),
                })?;
        let filled_notional = self
            .filled_notional
            .checked_add(notional(clearing_price, qty_filled)?)
            .ok_or(BlockclearError::ArithmeticOverflow {
                operation: "apply_fill",
            })?;
        let spent = match self.direction {
            Direction::Bid => {
                amount_ceil(filled_notional).saturating_sub(amount_ceil(self.filled_notional))
            }
            Direction::Ask => qty_filled.units(),
        };
        let remaining = required_escrow(self.direction, self.price, quantity, filled_notional)?;
        let refund = self
            .escrow
            .checked_sub(spent)
            .and_then(|left| left.checked_sub(remaining))
            .ok_or_else(|| BlockclearError::SupplyInvariantViolation {
                reason: format!(
                    "order {}: escrow {} cannot cover {spent} spent and {remaining} still owed",
                    self.id, self.escrow
                ),
            })?;

        self.quantity = quantity;
        self.filled_notional = filled_notional;
        self.escrow = remaining;
        Ok(refund)
    }
}

fn required_escrow(
    direction: Direction,
    price: Price,
    quantity: Quantity,
    filled_notional: u128,
) -> Result<Amount> {
    match direction {
        Direction::Bid => {
            let total = notional(price, quantity)?.checked_add(filled_notional).ok_or(
                BlockclearError::ArithmeticOverflow {
                    operation: "required_escrow",
                },
            )?;
            Ok(amount_ceil(total).saturating_sub(amount_ceil(filled_notional)))
        }
        Direction::Ask => Ok(quantity.units()),
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    pub fn dummy(id: u64, direction: Direction, price: Price, quantity: Quantity) -> Self {
        let mut order = Self {
            id: OrderId(id),
            owner: AccountId::new(),
            market_id: MarketId(1),
            direction,
            price,
            quantity,
            created_block: 1,
            created_time: DateTime::<Utc>::default(),
            time_in_force_blocks: crate::constants::MAX_TIME_IN_FORCE,
            status: OrderStatus::Open,
            escrow: 0,
            filled_notional: 0,
        };
        order.escrow = order.required_escrow().unwrap_or_default();
        order
    }
}
