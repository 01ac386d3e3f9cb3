//! Interfaces the execution pipeline consumes from its collaborators.
//!
//! Order storage, the market registry, balances, events and metrics all
//! live outside the core. The pipeline only talks to them through these
//! traits; `blockclear-ledger` provides in-memory implementations.

use std::time::Duration;

use crate::{AccountId, Amount, Event, Market, MarketId, Order, OrderId, Result};

/// Open-order storage, keyed by ascending [`OrderId`].
pub trait OrderStore {
    /// Visit orders in ascending id order until `visit` returns `false`.
    fn iterate(&self, visit: &mut dyn FnMut(&Order) -> bool);

    /// Visit orders in descending id order until `visit` returns `false`.
    fn reverse_iterate(&self, visit: &mut dyn FnMut(&Order) -> bool);

    /// Fetch an order. Errors with `OrderNotFound` if absent.
    fn get(&self, id: OrderId) -> Result<Order>;

    /// Insert or overwrite an order.
    fn set(&mut self, order: Order) -> Result<()>;

    /// Remove an order without touching balances.
    fn delete(&mut self, id: OrderId) -> Result<()>;

    /// Remove an order and return its reserved funds to the owner.
    fn cancel(
        &mut self,
        id: OrderId,
        markets: &dyn MarketRegistry,
        bank: &mut dyn BalanceAccessor,
    ) -> Result<Order>;
}

/// Read access to registered markets.
pub trait MarketRegistry {
    fn get(&self, id: MarketId) -> Result<Market>;
}

/// Credits balances.
pub trait BalanceAccessor {
    /// Errors on an unknown denomination or on overflow.
    fn credit(&mut self, account: AccountId, asset: &str, amount: Amount) -> Result<()>;
}

/// Destination for batch and fill events.
pub trait EventSink {
    fn publish(&mut self, event: Event) -> Result<()>;
}

/// Destination for per-block processing metrics.
pub trait MetricsSink {
    fn observe_processing_time(&mut self, elapsed: Duration);
    fn observe_fills_processed(&mut self, count: usize);
}

/// Discards all metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn observe_processing_time(&mut self, _elapsed: Duration) {}
    fn observe_fills_processed(&mut self, _count: usize) {}
}
