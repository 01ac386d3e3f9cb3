//! Error types for blockclear.
//!
//! All errors use the `BC_ERR_` prefix so they are easy to grep in logs.
//! Codes are grouped by subsystem:
//! - 1xx: Order errors
//! - 2xx: Balance errors
//! - 3xx: Market errors
//! - 4xx: Numeric errors
//! - 5xx: Settlement errors
//! - 9xx: Configuration errors
//!
//! Everything in the 5xx range is a protocol invariant violation: the
//! surrounding driver must abort the block when it sees one.

use thiserror::Error;

use crate::{AccountId, MarketId, OrderId};

/// Central error enum for all blockclear operations.
#[derive(Debug, Error)]
pub enum BlockclearError {
    // =================================================================
    // Order Errors (1xx)
    // =================================================================
    /// The requested order is not in the store.
    #[error("BC_ERR_100: Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order failed admission checks.
    #[error("BC_ERR_101: Invalid order: {reason}")]
    InvalidOrder { reason: String },

    // =================================================================
    // Balance Errors (2xx)
    // =================================================================
    /// The account cannot cover a debit.
    #[error("BC_ERR_200: Insufficient funds for {account} in {asset}: need {needed}, have {available}")]
    InsufficientFunds {
        account: AccountId,
        asset: String,
        needed: u128,
        available: u128,
    },

    /// The denomination is not registered with the balance accessor.
    #[error("BC_ERR_201: Unknown denomination: {0}")]
    UnknownDenomination(String),

    // =================================================================
    // Market Errors (3xx)
    // =================================================================
    /// The market is not registered.
    #[error("BC_ERR_300: Market not found: {0}")]
    MarketNotFound(MarketId),

    /// The market definition is malformed.
    #[error("BC_ERR_301: Invalid market: {reason}")]
    InvalidMarket { reason: String },

    // =================================================================
    // Numeric Errors (4xx)
    // =================================================================
    /// A checked operation overflowed.
    #[error("BC_ERR_400: Arithmetic overflow in {operation}")]
    ArithmeticOverflow { operation: &'static str },

    /// A human-entered amount could not be represented.
    #[error("BC_ERR_401: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    // =================================================================
    // Settlement Errors (5xx)
    // =================================================================
    /// A fill referenced an order that is not in the store.
    #[error("BC_ERR_500: Fill references missing order {0}")]
    FillOrderMissing(OrderId),

    /// Seller proceeds rounded to zero for a nonzero fill.
    #[error("BC_ERR_501: Clearing price {price} too small to represent for order {order_id} filling {qty_filled}")]
    ValueDestroyingRounding {
        order_id: OrderId,
        price: String,
        qty_filled: String,
    },

    /// A fill does not add up to the order's quantity.
    #[error("BC_ERR_502: Fill for order {order_id} does not conserve quantity: {reason}")]
    FillQuantityMismatch { order_id: OrderId, reason: String },

    /// An event could not be published and the policy says abort.
    #[error("BC_ERR_503: Event publish failed: {reason}")]
    PublishFailed { reason: String },

    /// More of an asset is held than was ever deposited.
    #[error("BC_ERR_504: Supply invariant violated: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // Configuration (9xx)
    // =================================================================
    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("BC_ERR_900: Configuration error: {0}")]
    Configuration(String),
}

impl BlockclearError {
    /// Whether this error is a protocol invariant violation rather than a
    /// user-facing rejection.
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::FillOrderMissing(_)
                | Self::ValueDestroyingRounding { .. }
                | Self::FillQuantityMismatch { .. }
                | Self::SupplyInvariantViolation { .. }
                | Self::ArithmeticOverflow { .. }
        )
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, BlockclearError>;

impl From<serde_json::Error> for BlockclearError {
    fn from(err: serde_json::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}
