//! Time-in-force expiry.
//!
//! At height `H` an order is expired once `H - created_block` exceeds its
//! time-in-force. Expired ids are all collected first, in ascending id
//! order, and only then cancelled, so the scan never observes its own
//! deletions.

use blockclear_types::{OrderId, OrderStore, Result};

use crate::StateAccess;

/// Ids of every order expired at `height`, ascending.
#[must_use]
pub fn scan_expired(orders: &dyn OrderStore, height: u64) -> Vec<OrderId> {
    let mut expired = Vec::new();
    orders.iterate(&mut |order| {
        if order.is_expired_at(height) {
            expired.push(order.id);
        }
        true
    });
    expired
}

/// Cancel every order expired at `height`, returning funds to owners.
///
/// # Errors
/// Propagates the first cancellation failure. Orders before it stay
/// cancelled; the driver is expected to discard the block.
pub fn cancel_expired(state: &mut StateAccess<'_>, height: u64) -> Result<Vec<OrderId>> {
    let expired = scan_expired(&*state.orders, height);
    for &id in &expired {
        state.orders.cancel(id, state.markets, &mut *state.bank)?;
        tracing::debug!(order_id = %id, height, "Expired order cancelled");
    }
    if !expired.is_empty() {
        tracing::info!(height, count = expired.len(), "Cancelled expired orders");
    }
    Ok(expired)
}
