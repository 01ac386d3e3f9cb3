//! Per-block inputs to the execution pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use blockclear_types::{BalanceAccessor, MarketRegistry, OrderStore};

/// Mutable views of the ledger state one block executes against.
pub struct StateAccess<'a> {
    pub orders: &'a mut dyn OrderStore,
    pub markets: &'a dyn MarketRegistry,
    pub bank: &'a mut dyn BalanceAccessor,
}

impl<'a> StateAccess<'a> {
    pub fn new(
        orders: &'a mut dyn OrderStore,
        markets: &'a dyn MarketRegistry,
        bank: &'a mut dyn BalanceAccessor,
    ) -> Self {
        Self {
            orders,
            markets,
            bank,
        }
    }
}

/// The block being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    pub height: u64,
    pub time: DateTime<Utc>,
}

impl BlockContext {
    #[must_use]
    pub fn new(height: u64, time: DateTime<Utc>) -> Self {
        Self { height, time }
    }
}
