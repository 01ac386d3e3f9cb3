//! Unsigned fixed-point numerics.
//!
//! Prices and quantities are `u128` counts of smallest units, where
//! [`SCALE`] units make one whole unit (8 implied decimals). Nothing here
//! uses floating point and nothing wraps: every operation that can overflow
//! is checked.
//!
//! `rust_decimal` is only used at the edges, to convert human-entered
//! values in and out.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{BlockclearError, Result};

/// Number of implied decimals of every asset and of prices.
pub const ASSET_DECIMALS: u32 = 8;

/// `10^ASSET_DECIMALS`.
pub const SCALE: u128 = 100_000_000;

/// A settlement amount in smallest units of some asset.
pub type Amount = u128;

macro_rules! fixed_point {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u128);

        impl $name {
            pub const ZERO: Self = Self(0);

            /// From a raw count of smallest units.
            #[must_use]
            pub const fn from_units(units: u128) -> Self {
                Self(units)
            }

            /// From a whole number, i.e. `whole * 10^8` units.
            #[must_use]
            pub fn from_whole(whole: u64) -> Self {
                Self(u128::from(whole) * SCALE)
            }

            #[must_use]
            pub const fn units(self) -> u128 {
                self.0
            }

            #[must_use]
            pub const fn is_zero(self) -> bool {
                self.0 == 0
            }

            #[must_use]
            pub fn checked_add(self, rhs: Self) -> Option<Self> {
                self.0.checked_add(rhs.0).map(Self)
            }

            #[must_use]
            pub fn checked_sub(self, rhs: Self) -> Option<Self> {
                self.0.checked_sub(rhs.0).map(Self)
            }

            #[must_use]
            pub fn saturating_sub(self, rhs: Self) -> Self {
                Self(self.0.saturating_sub(rhs.0))
            }

            /// Parse a non-negative decimal with at most 8 fractional digits.
            pub fn from_decimal(value: Decimal) -> Result<Self> {
                decimal_to_units(value).map(Self)
            }

            /// The value as a `Decimal`, or `None` if it exceeds `Decimal`'s range.
            #[must_use]
            pub fn to_decimal(self) -> Option<Decimal> {
                let mantissa = i128::try_from(self.0).ok()?;
                Decimal::try_from_i128_with_scale(mantissa, ASSET_DECIMALS).ok()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}.{:08}", self.0 / SCALE, self.0 % SCALE)
            }
        }
    };
}

fixed_point! {
    /// Quote-per-base price with 8 implied decimals.
    Price
}

fixed_point! {
    /// Base-asset quantity in smallest units.
    Quantity
}

fn decimal_to_units(value: Decimal) -> Result<u128> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(BlockclearError::InvalidAmount {
            reason: format!("{value} is negative"),
        });
    }
    let value = value.normalize();
    let scale = value.scale();
    if scale > ASSET_DECIMALS {
        return Err(BlockclearError::InvalidAmount {
            reason: format!("{value} has more than {ASSET_DECIMALS} decimals"),
        });
    }
    value
        .mantissa()
        .unsigned_abs()
        .checked_mul(10u128.pow(ASSET_DECIMALS - scale))
        .ok_or(BlockclearError::ArithmeticOverflow {
            operation: "decimal_to_units",
        })
}

/// Outcome of [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalized {
    /// `floor(price * quantity / 10^8)`.
    pub amount: Amount,
    /// The product was nonzero but the result rounded down to zero.
    pub truncated_to_zero: bool,
}

/// Convert a (price, base quantity) pair into a quote settlement amount.
///
/// `floor(price * quantity / 10^8)`. Rounds toward zero, so it never
/// produces more quote than the exact product.
pub fn normalize(price: Price, quantity: Quantity) -> Result<Normalized> {
    let product = notional(price, quantity)?;
    let amount = product / SCALE;
    Ok(Normalized {
        amount,
        truncated_to_zero: amount == 0 && product != 0,
    })
}

/// `price * quantity` before scaling back to amount units.
pub fn notional(price: Price, quantity: Quantity) -> Result<u128> {
    price
        .units()
        .checked_mul(quantity.units())
        .ok_or(BlockclearError::ArithmeticOverflow {
            operation: "normalize",
        })
}

/// Scale a notional back to a settlement amount, rounding up.
#[must_use]
pub fn amount_ceil(notional: u128) -> Amount {
    notional.div_ceil(SCALE)
}
