//! The per-block execution pipeline.
//!
//! ```text
//! expire -> enqueue -> match (per market, ascending id) -> settle -> events
//! ```
//!
//! Matching for every market completes before the first fill is settled.
//! Markets are visited in ascending id and fills in result order, so every
//! side effect of a block happens in one canonical order on all replicas.
//!
//! Settlement errors are protocol invariant violations. The pipeline stops
//! at the first one and returns it; the driver discards the block.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use blockclear_matchcore::{Matcher, MatcherPool, match_root_hex};
use blockclear_types::{
    Batch, BlockclearError, Direction, Event, EventSink, ExecutionConfig, Fill, FillEvent,
    MarketId, MatchResult, MetricsSink, OrderStatus, Price, PublishFailurePolicy, Result,
    constants, normalize,
};

use crate::{BlockContext, StateAccess, expiry::cancel_expired};

/// What one block did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    /// Orders cancelled for exceeding their time-in-force.
    pub expired: usize,
    /// Markets that produced a clearing price.
    pub markets_matched: usize,
    /// Fills settled across all markets.
    pub fills: usize,
    /// Hex match root per matched market.
    pub match_roots: BTreeMap<MarketId, String>,
}

/// Drives expiry, matching and settlement for each block.
#[derive(Debug)]
pub struct ExecutionKeeper<E, M> {
    config: ExecutionConfig,
    pool: MatcherPool,
    events: E,
    metrics: M,
}

impl<E: EventSink, M: MetricsSink> ExecutionKeeper<E, M> {
    /// # Errors
    /// `Configuration` if `config` fails validation.
    pub fn new(config: ExecutionConfig, events: E, metrics: M) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            engine = constants::ENGINE_NAME,
            version = constants::VERSION,
            policy = ?config.publish_failure_policy,
            pool_capacity = config.matcher_pool_capacity,
            "Execution keeper initialized"
        );
        Ok(Self {
            pool: MatcherPool::new(config.matcher_pool_capacity),
            config,
            events,
            metrics,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    #[must_use]
    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }

    #[must_use]
    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    #[must_use]
    pub fn pool(&self) -> &MatcherPool {
        &self.pool
    }

    // =================================================================
    // Block execution
    // =================================================================

    /// Run one block: cancel expired orders, clear every market, settle
    /// all fills and publish batch and fill events.
    ///
    /// # Errors
    /// Any invariant violation during settlement, a failed expiry
    /// cancellation, or a publish failure under
    /// [`PublishFailurePolicy::Abort`].
    pub fn execute_and_cancel_expired(
        &mut self,
        state: &mut StateAccess<'_>,
        block: BlockContext,
    ) -> Result<BlockSummary> {
        let started = Instant::now();

        let expired = cancel_expired(state, block.height)?;

        let mut matchers: BTreeMap<MarketId, Matcher> = BTreeMap::new();
        let outcome = self.match_and_settle(state, block, &mut matchers);
        for matcher in matchers.into_values() {
            self.pool.release(matcher);
        }
        let mut summary = outcome?;
        summary.expired = expired.len();

        self.metrics.observe_processing_time(started.elapsed());
        self.metrics.observe_fills_processed(summary.fills);

        tracing::info!(
            height = block.height,
            expired = summary.expired,
            markets_matched = summary.markets_matched,
            fills = summary.fills,
            "Block executed"
        );
        Ok(summary)
    }

    fn match_and_settle(
        &mut self,
        state: &mut StateAccess<'_>,
        block: BlockContext,
        matchers: &mut BTreeMap<MarketId, Matcher>,
    ) -> Result<BlockSummary> {
        let pool = &mut self.pool;
        state.orders.iterate(&mut |order| {
            matchers
                .entry(order.market_id)
                .or_insert_with(|| pool.acquire())
                .enqueue_order(order.direction, order.id, order.price, order.quantity);
            true
        });

        let mut results: Vec<(MarketId, MatchResult)> = Vec::new();
        for (&market_id, matcher) in matchers.iter() {
            let Some(result) = matcher.match_orders() else {
                continue;
            };
            tracing::info!(
                height = block.height,
                market_id = %market_id,
                clearing_price = %result.clearing_price,
                matched_volume = %result.matched_volume,
                fills = result.fills.len(),
                "Market cleared"
            );
            self.publish(Event::Batch(Batch {
                block_number: block.height,
                block_time: block.time,
                market_id,
                clearing_price: result.clearing_price,
                bids: result.bid_aggregates.clone(),
                asks: result.ask_aggregates.clone(),
            }))?;
            results.push((market_id, result));
        }

        let mut summary = BlockSummary {
            markets_matched: results.len(),
            ..BlockSummary::default()
        };
        for (market_id, result) in &results {
            for fill in &result.fills {
                self.execute_fill(state, block, result.clearing_price, fill)?;
            }
            summary.fills += result.fills.len();
            summary.match_roots.insert(*market_id, match_root_hex(result));
        }
        Ok(summary)
    }

    // =================================================================
    // Settlement
    // =================================================================

    /// Apply one fill: move funds to the owner, shrink or delete the order
    /// and publish a fill event.
    ///
    /// Bids receive `qty_filled` base. Their cost at `clearing_price` comes
    /// out of the order's escrow, rounded up over the order's cumulative
    /// notional, and whatever the remainder no longer needs is refunded in
    /// quote. A refund that rounds to zero is logged. Asks receive
    /// `normalize(clearing_price, qty_filled)` quote; proceeds that round to
    /// zero are an error.
    ///
    /// Buyers pay at least the exact value and sellers receive at most the
    /// exact value, so a block never puts more quote into circulation than
    /// its bids held in escrow.
    ///
    /// # Errors
    /// - `FillOrderMissing` if the order is gone
    /// - `MarketNotFound` if its market is gone
    /// - `FillQuantityMismatch` if the fill does not add up to the order
    /// - `ValueDestroyingRounding` if ask proceeds round to zero
    /// - `SupplyInvariantViolation` if the order's escrow cannot cover the fill
    /// - anything the balance accessor or order store returns
    pub fn execute_fill(
        &mut self,
        state: &mut StateAccess<'_>,
        block: BlockContext,
        clearing_price: Price,
        fill: &Fill,
    ) -> Result<()> {
        let mut order = state.orders.get(fill.order_id).map_err(|err| match err {
            BlockclearError::OrderNotFound(id) => BlockclearError::FillOrderMissing(id),
            other => other,
        })?;
        let market = state.markets.get(order.market_id)?;

        if fill.direction != order.direction {
            return Err(BlockclearError::FillQuantityMismatch {
                order_id: order.id,
                reason: format!("fill is {} but order is {}", fill.direction, order.direction),
            });
        }
        if fill.original_quantity() != Some(order.quantity) {
            return Err(BlockclearError::FillQuantityMismatch {
                order_id: order.id,
                reason: format!(
                    "filled {} + unfilled {} != open {}",
                    fill.qty_filled, fill.qty_unfilled, order.quantity
                ),
            });
        }

        let limit = order.price;
        let refund = order.apply_fill(clearing_price, fill.qty_filled)?;

        match order.direction {
            Direction::Bid => {
                state
                    .bank
                    .credit(order.owner, &market.base_asset_denom, fill.qty_filled.units())?;
                if refund > 0 {
                    state
                        .bank
                        .credit(order.owner, &market.quote_asset_denom, refund)?;
                } else if clearing_price < limit {
                    tracing::info!(
                        order_id = %order.id,
                        price = %limit,
                        clearing_price = %clearing_price,
                        qty_filled = %fill.qty_filled,
                        "Refund rounds to zero"
                    );
                }
            }
            Direction::Ask => {
                let proceeds = normalize(clearing_price, fill.qty_filled)?;
                if proceeds.truncated_to_zero {
                    return Err(BlockclearError::ValueDestroyingRounding {
                        order_id: order.id,
                        price: clearing_price.to_string(),
                        qty_filled: fill.qty_filled.to_string(),
                    });
                }
                state
                    .bank
                    .credit(order.owner, &market.quote_asset_denom, proceeds.amount)?;
            }
        }

        if fill.qty_unfilled.is_zero() {
            state.orders.delete(order.id)?;
        } else {
            order.status = OrderStatus::PartiallyFilled;
            state.orders.set(order.clone())?;
        }

        tracing::debug!(
            order_id = %order.id,
            direction = %order.direction,
            qty_filled = %fill.qty_filled,
            qty_unfilled = %fill.qty_unfilled,
            "Fill settled"
        );

        self.publish(Event::Fill(FillEvent {
            order_id: order.id,
            market_id: order.market_id,
            owner: order.owner,
            pair: market.symbol(),
            direction: order.direction,
            qty_filled: fill.qty_filled,
            qty_unfilled: fill.qty_unfilled,
            block_number: block.height,
            block_time: block.time.timestamp(),
            price: clearing_price,
        }))
    }

    fn publish(&mut self, event: Event) -> Result<()> {
        let Err(err) = self.events.publish(event) else {
            return Ok(());
        };
        match self.config.publish_failure_policy {
            PublishFailurePolicy::BestEffort => {
                tracing::warn!(error = %err, "Event publish failed, continuing");
                Ok(())
            }
            PublishFailurePolicy::Abort => Err(match err {
                err @ BlockclearError::PublishFailed { .. } => err,
                other => BlockclearError::PublishFailed {
                    reason: other.to_string(),
                },
            }),
        }
    }
}
