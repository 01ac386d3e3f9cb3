//! Events published to the event sink.
//!
//! The core does not own or store these; it hands them to whatever
//! [`EventSink`](crate::EventSink) the driver provides.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, Direction, MarketId, OrderId, Price, PriceLevelVolume, Quantity};

/// One cleared market in one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub block_number: u64,
    pub block_time: DateTime<Utc>,
    pub market_id: MarketId,
    pub clearing_price: Price,
    pub bids: Vec<PriceLevelVolume>,
    pub asks: Vec<PriceLevelVolume>,
}

/// One settled fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillEvent {
    pub order_id: OrderId,
    pub market_id: MarketId,
    pub owner: AccountId,
    /// Pair symbol, `base/quote`.
    pub pair: String,
    pub direction: Direction,
    pub qty_filled: Quantity,
    pub qty_unfilled: Quantity,
    pub block_number: u64,
    /// Unix seconds.
    pub block_time: i64,
    pub price: Price,
}

/// Everything the pipeline publishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Batch(Batch),
    Fill(FillEvent),
}

impl Event {
    #[must_use]
    pub fn as_batch(&self) -> Option<&Batch> {
        match self {
            Self::Batch(b) => Some(b),
            Self::Fill(_) => None,
        }
    }

    #[must_use]
    pub fn as_fill(&self) -> Option<&FillEvent> {
        match self {
            Self::Fill(f) => Some(f),
            Self::Batch(_) => None,
        }
    }
}
