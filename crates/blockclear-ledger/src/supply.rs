//! Supply audit.
//!
//! Settlement never creates value. Escrow leaves circulation when an order
//! is posted and comes back as fills, refunds or cancellations. Buyers pay
//! for fills rounded up and sellers are paid rounded down, so for each
//! asset:
//!
//! ```text
//! Σ balances <= Σ deposits
//! ```
//!
//! The gap is funds still reserved by resting orders plus rounding dust.

use std::collections::BTreeMap;

use blockclear_types::{Amount, Asset, BlockclearError, Result};

/// Per-asset deposit totals.
#[derive(Debug, Default, Clone)]
pub struct SupplyAudit {
    deposits: BTreeMap<Asset, Amount>,
}

impl SupplyAudit {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a deposit. Saturates rather than failing; the balance
    /// credit that accompanies it is the checked operation.
    pub fn record_deposit(&mut self, asset: &str, amount: Amount) {
        let total = self.deposits.entry(asset.to_string()).or_default();
        *total = total.saturating_add(amount);
    }

    /// Total ever deposited of `asset`.
    #[must_use]
    pub fn total_deposits(&self, asset: &str) -> Amount {
        self.deposits.get(asset).copied().unwrap_or(0)
    }

    /// Check `actual_supply` against deposits and return the shortfall.
    ///
    /// # Errors
    /// Returns [`BlockclearError::SupplyInvariantViolation`] if
    /// `actual_supply` exceeds total deposits.
    pub fn verify(&self, asset: &str, actual_supply: Amount) -> Result<Amount> {
        let deposited = self.total_deposits(asset);
        deposited.checked_sub(actual_supply).ok_or_else(|| {
            BlockclearError::SupplyInvariantViolation {
                reason: format!("asset {asset}: held {actual_supply} exceeds deposits {deposited}"),
            }
        })
    }

    /// Assets with at least one recorded deposit, in name order.
    pub fn tracked_assets(&self) -> impl Iterator<Item = &str> {
        self.deposits.keys().map(String::as_str)
    }
}
