//! Account balances.
//!
//! Tracks one spendable amount per (account, asset). Funds reserved by a
//! resting order are debited here at post time and are not part of any
//! balance until they come back through a fill, refund or cancel.
//! Mutations are atomic: on error the balance is unchanged.

use std::collections::{BTreeMap, BTreeSet};

use blockclear_types::{AccountId, Amount, Asset, BalanceAccessor, BlockclearError, Result};

use crate::SupplyAudit;

/// In-memory balance store for registered denominations.
#[derive(Debug, Default)]
pub struct BalanceManager {
    denominations: BTreeSet<Asset>,
    balances: BTreeMap<(AccountId, Asset), Amount>,
    audit: SupplyAudit,
}

impl BalanceManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `asset` known. Idempotent.
    pub fn register_denomination(&mut self, asset: &str) {
        self.denominations.insert(asset.to_string());
    }

    #[must_use]
    pub fn is_registered(&self, asset: &str) -> bool {
        self.denominations.contains(asset)
    }

    fn ensure_registered(&self, asset: &str) -> Result<()> {
        if self.is_registered(asset) {
            Ok(())
        } else {
            Err(BlockclearError::UnknownDenomination(asset.to_string()))
        }
    }

    /// Bring new funds into the ledger and record them with the audit.
    ///
    /// # Errors
    /// `UnknownDenomination` or `ArithmeticOverflow`.
    pub fn deposit(&mut self, account: AccountId, asset: &str, amount: Amount) -> Result<()> {
        self.add(account, asset, amount)?;
        self.audit.record_deposit(asset, amount);
        tracing::debug!(%account, asset, amount, "Deposit");
        Ok(())
    }

    /// Take funds out of an account.
    ///
    /// # Errors
    /// `UnknownDenomination`, or `InsufficientFunds` if the balance is
    /// below `amount`.
    pub fn debit(&mut self, account: AccountId, asset: &str, amount: Amount) -> Result<()> {
        self.ensure_registered(asset)?;
        let available = self.balance(account, asset);
        let remaining = available
            .checked_sub(amount)
            .ok_or_else(|| BlockclearError::InsufficientFunds {
                account,
                asset: asset.to_string(),
                needed: amount,
                available,
            })?;
        self.balances.insert((account, asset.to_string()), remaining);
        Ok(())
    }

    fn add(&mut self, account: AccountId, asset: &str, amount: Amount) -> Result<()> {
        self.ensure_registered(asset)?;
        let entry = self.balances.entry((account, asset.to_string())).or_default();
        *entry = entry
            .checked_add(amount)
            .ok_or(BlockclearError::ArithmeticOverflow { operation: "credit" })?;
        Ok(())
    }

    /// Spendable balance, zero if the account never held `asset`.
    #[must_use]
    pub fn balance(&self, account: AccountId, asset: &str) -> Amount {
        self.balances
            .get(&(account, asset.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of all balances of `asset`.
    #[must_use]
    pub fn total_supply(&self, asset: &str) -> Amount {
        self.balances
            .iter()
            .filter(|((_, a), _)| a == asset)
            .fold(0u128, |acc, (_, amount)| acc.saturating_add(*amount))
    }

    /// Check every deposited asset against the audit.
    ///
    /// # Errors
    /// `SupplyInvariantViolation` for the first asset holding more than
    /// was deposited.
    pub fn verify_supply(&self) -> Result<()> {
        for asset in self.audit.tracked_assets() {
            let dust = self.audit.verify(asset, self.total_supply(asset))?;
            tracing::trace!(asset, outstanding = dust, "Supply verified");
        }
        Ok(())
    }

    #[must_use]
    pub fn audit(&self) -> &SupplyAudit {
        &self.audit
    }
}

impl BalanceAccessor for BalanceManager {
    fn credit(&mut self, account: AccountId, asset: &str, amount: Amount) -> Result<()> {
        self.add(account, asset, amount)
    }
}
