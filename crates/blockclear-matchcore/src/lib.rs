//! # blockclear-matchcore
//!
//! **Pure deterministic call-auction matcher for blockclear.**
//!
//! One [`Matcher`] per market per block collects the market's open orders
//! and clears them at a single uniform price. It has:
//!
//! - **Zero side effects**: no storage, no balances, no events
//! - **Deterministic output**: same enqueue sequence -> same [`MatchResult`]
//!   and same match root on every replica
//! - **Price-time priority**: allocation at the clearing price follows level
//!   order, then enqueue order
//!
//! [`MatchResult`]: blockclear_types::MatchResult

pub mod clearing;
pub mod determinism;
pub mod matcher;
pub mod orderbook;
pub mod pool;
pub mod price_level;

pub use clearing::{ClearingResult, compute_clearing_price};
pub use determinism::{compute_match_root, match_root_hex, verify_match_root};
pub use matcher::Matcher;
pub use orderbook::OrderBook;
pub use pool::MatcherPool;
pub use price_level::{LevelEntry, PriceLevel};
