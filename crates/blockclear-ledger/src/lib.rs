//! # blockclear-ledger
//!
//! **In-memory reference ledger for blockclear.**
//!
//! The execution pipeline only sees its collaborators through the traits in
//! `blockclear_types::ports`. This crate implements all of them in memory,
//! together with the order-admission side of the exchange:
//!
//! - [`OrderKeeper`]: post with validation and fund reservation, cancel with
//!   refund, owner index, paginated listing
//! - [`MarketDirectory`]: market registration and lookup
//! - [`BalanceManager`]: per-account balances with checked credits
//! - [`SupplyAudit`]: per-asset deposit totals; nothing may hold more than
//!   was deposited
//! - [`EventLog`] / [`MetricsRecorder`]: recording sinks

pub mod balance_manager;
pub mod events;
pub mod markets;
pub mod metrics;
pub mod order_keeper;
pub mod supply;

pub use balance_manager::BalanceManager;
pub use events::EventLog;
pub use markets::MarketDirectory;
pub use metrics::MetricsRecorder;
pub use order_keeper::{ListQuery, ListResult, OrderKeeper, PostOrder};
pub use supply::SupplyAudit;
