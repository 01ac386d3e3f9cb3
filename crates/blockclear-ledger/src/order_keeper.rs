//! Open-order storage with admission and listing.
//!
//! Posting validates an order, moves its funds into the order's escrow by
//! debiting the owner and assigns the next monotonic id. Bids escrow their
//! full cost rounded up. Cancelling returns whatever is still in escrow. Orders are only ever removed whole; a
//! partially filled order stays with its reduced quantity.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use blockclear_types::{
    AccountId, BalanceAccessor, BlockclearError, Direction, MarketId, MarketRegistry, Order,
    OrderId, OrderStatus, OrderStore, Price, Quantity, Result, constants, normalize,
};

use crate::BalanceManager;

/// A request to place a limit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostOrder {
    pub owner: AccountId,
    pub market_id: MarketId,
    pub direction: Direction,
    pub price: Price,
    pub quantity: Quantity,
    pub time_in_force_blocks: u16,
}

/// Filters for [`OrderKeeper::list`]. Empty filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub market_ids: Vec<MarketId>,
    pub statuses: Vec<OrderStatus>,
    /// Walk only this owner's orders.
    pub owner: Option<AccountId>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    /// Highest id to consider. `None` or `OrderId::ZERO` starts from the
    /// newest order.
    pub start: Option<OrderId>,
    /// Maximum orders to return, 0 for no limit.
    pub limit: usize,
}

impl ListQuery {
    fn matches(&self, order: &Order) -> bool {
        (self.market_ids.is_empty() || self.market_ids.contains(&order.market_id))
            && (self.statuses.is_empty() || self.statuses.contains(&order.status))
            && self.created_after.is_none_or(|t| order.created_time >= t)
            && self.created_before.is_none_or(|t| order.created_time <= t)
    }

    fn is_full(&self, found: usize) -> bool {
        self.limit != 0 && found >= self.limit
    }
}

/// A page of orders, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResult {
    pub orders: Vec<Order>,
    /// Pass as `start` to fetch the next page. `OrderId::ZERO` when there
    /// is nothing more.
    pub next_id: OrderId,
}

/// In-memory [`OrderStore`].
#[derive(Debug)]
pub struct OrderKeeper {
    orders: BTreeMap<OrderId, Order>,
    by_owner: BTreeMap<AccountId, BTreeSet<OrderId>>,
    last_id: OrderId,
    max_time_in_force: u16,
}

impl Default for OrderKeeper {
    fn default() -> Self {
        Self::new(constants::MAX_TIME_IN_FORCE)
    }
}

impl OrderKeeper {
    #[must_use]
    pub fn new(max_time_in_force: u16) -> Self {
        Self {
            orders: BTreeMap::new(),
            by_owner: BTreeMap::new(),
            last_id: OrderId::ZERO,
            max_time_in_force,
        }
    }

    // =================================================================
    // Admission
    // =================================================================

    /// Validate, reserve funds and store a new order.
    ///
    /// # Errors
    /// - `MarketNotFound` if the market is not registered
    /// - `InvalidOrder` for a zero price or quantity, a time-in-force
    ///   outside `1..=max`, or a bid whose quote reservation rounds to zero
    /// - `InsufficientFunds` if the owner cannot cover the reservation
    pub fn post(
        &mut self,
        request: PostOrder,
        block_height: u64,
        block_time: DateTime<Utc>,
        markets: &dyn MarketRegistry,
        bank: &mut BalanceManager,
    ) -> Result<Order> {
        let market = markets.get(request.market_id)?;
        self.validate(&request)?;

        let mut order = Order {
            id: self.last_id.next(),
            owner: request.owner,
            market_id: request.market_id,
            direction: request.direction,
            price: request.price,
            quantity: request.quantity,
            created_block: block_height,
            created_time: block_time,
            time_in_force_blocks: request.time_in_force_blocks,
            status: OrderStatus::Open,
            escrow: 0,
            filled_notional: 0,
        };
        order.escrow = order.required_escrow()?;
        bank.debit(order.owner, order.escrow_asset(&market), order.escrow)?;

        self.last_id = order.id;
        self.insert(order.clone());
        tracing::info!(
            order_id = %order.id,
            market_id = %order.market_id,
            direction = %order.direction,
            price = %order.price,
            quantity = %order.quantity,
            escrow = order.escrow,
            "Order posted"
        );
        Ok(order)
    }

    fn validate(&self, request: &PostOrder) -> Result<()> {
        let reject = |reason: String| Err(BlockclearError::InvalidOrder { reason });
        if request.price.is_zero() {
            return reject("price cannot be zero".into());
        }
        if request.quantity.is_zero() {
            return reject("quantity cannot be zero".into());
        }
        if request.time_in_force_blocks == 0 {
            return reject("time in force cannot be zero".into());
        }
        if request.time_in_force_blocks > self.max_time_in_force {
            return reject(format!(
                "time in force cannot be larger than {}",
                self.max_time_in_force
            ));
        }
        if request.direction == Direction::Bid
            && normalize(request.price, request.quantity)?.truncated_to_zero
        {
            return reject(format!(
                "bid of {} at {} is worth less than one quote unit",
                request.quantity, request.price
            ));
        }
        Ok(())
    }

    /// Cancel on behalf of `owner`.
    ///
    /// # Errors
    /// `OrderNotFound`, or `InvalidOrder` if `owner` does not own the order.
    pub fn cancel_as(
        &mut self,
        owner: AccountId,
        id: OrderId,
        markets: &dyn MarketRegistry,
        bank: &mut dyn BalanceAccessor,
    ) -> Result<Order> {
        let order = self.get(id)?;
        if order.owner != owner {
            return Err(BlockclearError::InvalidOrder {
                reason: format!("order {id} is not owned by {owner}"),
            });
        }
        self.cancel(id, markets, bank)
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Orders newest first, filtered and paginated.
    #[must_use]
    pub fn list(&self, query: &ListQuery) -> ListResult {
        let upper = match query.start {
            Some(start) if start.is_defined() => Bound::Included(start),
            _ => Bound::Unbounded,
        };
        let mut orders = Vec::new();

        let ids: Box<dyn Iterator<Item = &OrderId> + '_> = match query.owner {
            Some(owner) => match self.by_owner.get(&owner) {
                Some(ids) => Box::new(ids.range((Bound::Unbounded, upper)).rev()),
                None => Box::new(std::iter::empty()),
            },
            None => Box::new(self.orders.range((Bound::Unbounded, upper)).rev().map(|(id, _)| id)),
        };

        for order in ids.filter_map(|id| self.orders.get(id)) {
            if !query.matches(order) {
                continue;
            }
            orders.push(order.clone());
            if query.is_full(orders.len()) {
                break;
            }
        }

        let next_id = match orders.last() {
            Some(last) if query.is_full(orders.len()) => last.id.prev(),
            _ => OrderId::ZERO,
        };
        ListResult { orders, next_id }
    }

    /// Ids of every open order owned by `owner`, ascending.
    #[must_use]
    pub fn orders_by_owner(&self, owner: AccountId) -> Vec<OrderId> {
        self.by_owner
            .get(&owner)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    // =================================================================
    // Internals
    // =================================================================

    fn insert(&mut self, order: Order) {
        self.by_owner.entry(order.owner).or_default().insert(order.id);
        if order.id > self.last_id {
            self.last_id = order.id;
        }
        self.orders.insert(order.id, order);
    }

    fn remove(&mut self, id: OrderId) -> Result<Order> {
        let order = self.orders.remove(&id).ok_or(BlockclearError::OrderNotFound(id))?;
        if let Some(ids) = self.by_owner.get_mut(&order.owner) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_owner.remove(&order.owner);
            }
        }
        Ok(order)
    }
}

impl OrderStore for OrderKeeper {
    fn iterate(&self, visit: &mut dyn FnMut(&Order) -> bool) {
        for order in self.orders.values() {
            if !visit(order) {
                break;
            }
        }
    }

    fn reverse_iterate(&self, visit: &mut dyn FnMut(&Order) -> bool) {
        for order in self.orders.values().rev() {
            if !visit(order) {
                break;
            }
        }
    }

    fn get(&self, id: OrderId) -> Result<Order> {
        self.orders.get(&id).cloned().ok_or(BlockclearError::OrderNotFound(id))
    }

    fn set(&mut self, order: Order) -> Result<()> {
        if order.price.is_zero() || order.quantity.is_zero() {
            return Err(BlockclearError::InvalidOrder {
                reason: format!("order {} must have a positive price and quantity", order.id),
            });
        }
        if self.orders.get(&order.id).is_some_and(|existing| existing.owner != order.owner) {
            return Err(BlockclearError::InvalidOrder {
                reason: format!("order {} cannot change owner", order.id),
            });
        }
        self.insert(order);
        Ok(())
    }

    fn delete(&mut self, id: OrderId) -> Result<()> {
        self.remove(id).map(|_| ())
    }

    fn cancel(
        &mut self,
        id: OrderId,
        markets: &dyn MarketRegistry,
        bank: &mut dyn BalanceAccessor,
    ) -> Result<Order> {
        let order = self.get(id)?;
        let market = markets.get(order.market_id)?;
        let asset = order.escrow_asset(&market);
        bank.credit(order.owner, asset, order.escrow)?;
        let order = self.remove(id)?;
        tracing::info!(order_id = %id, asset, amount = order.escrow, "Order cancelled");
        Ok(order)
    }
}
