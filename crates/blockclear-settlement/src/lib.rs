//! # blockclear-settlement
//!
//! **Per-block execution pipeline for blockclear.**
//!
//! [`ExecutionKeeper::execute_and_cancel_expired`] is the single entry point
//! a block driver calls. For one block it:
//!
//! 1. Cancels every order past its time-in-force, returning reserved funds
//! 2. Routes the remaining open orders into one matcher per market
//! 3. Clears each market at a uniform price, in ascending market id
//! 4. Publishes one batch event per cleared market
//! 5. Settles every fill: credits, refunds, order updates, fill events
//! 6. Returns matchers to the pool and records metrics
//!
//! Collaborators are reached only through the traits in
//! `blockclear_types::ports`, bundled per block in a [`StateAccess`].

pub mod expiry;
pub mod keeper;
pub mod state;

pub use expiry::{cancel_expired, scan_expired};
pub use keeper::{BlockSummary, ExecutionKeeper};
pub use state::{BlockContext, StateAccess};
