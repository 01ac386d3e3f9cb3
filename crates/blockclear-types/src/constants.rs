//! System-wide constants for blockclear.

/// Longest time-in-force an order may request, in blocks.
pub const MAX_TIME_IN_FORCE: u16 = 600;

/// Matchers kept warm by the pool between blocks (default).
pub const DEFAULT_MATCHER_POOL_CAPACITY: usize = 64;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "blockclear";
