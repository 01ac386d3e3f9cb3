//! # blockclear-types
//!
//! Shared types, errors, and configuration for the **blockclear** batch
//! auction.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`OrderId`], [`MarketId`], [`AccountId`]
//! - **Numerics**: [`Price`], [`Quantity`], [`normalize`]
//! - **Order model**: [`Order`], [`Direction`], [`OrderStatus`]
//! - **Market model**: [`Market`], [`Asset`]
//! - **Matcher output**: [`Fill`], [`MatchResult`], [`PriceLevelVolume`]
//! - **Events**: [`Event`], [`Batch`], [`FillEvent`]
//! - **Ports**: [`OrderStore`], [`MarketRegistry`], [`BalanceAccessor`],
//!   [`EventSink`], [`MetricsSink`]
//! - **Configuration**: [`ExecutionConfig`], [`PublishFailurePolicy`]
//! - **Errors**: [`BlockclearError`] with `BC_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod fill;
pub mod ids;
pub mod market;
pub mod numeric;
pub mod order;
pub mod ports;

pub use config::*;
pub use error::*;
pub use event::*;
pub use fill::*;
pub use ids::*;
pub use market::*;
pub use numeric::*;
pub use order::*;
pub use ports::*;

// Constants are accessed via `blockclear_types::constants::FOO`.
