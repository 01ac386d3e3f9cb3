//! Free-list of reusable [`Matcher`]s.
//!
//! Owned by the settlement pipeline. Reuse only saves allocations: a
//! matcher handed out by [`MatcherPool::acquire`] is always empty.

use crate::Matcher;

#[derive(Debug)]
pub struct MatcherPool {
    free: Vec<Matcher>,
    capacity: usize,
    created: usize,
}

impl MatcherPool {
    /// A pool that keeps at most `capacity` idle matchers.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Vec::with_capacity(capacity),
            capacity,
            created: 0,
        }
    }

    /// Take an idle matcher, or build a new one.
    pub fn acquire(&mut self) -> Matcher {
        self.free.pop().unwrap_or_else(|| {
            self.created += 1;
            Matcher::new()
        })
    }

    /// Reset `matcher` and keep it for reuse, unless the pool is full.
    pub fn release(&mut self, mut matcher: Matcher) {
        matcher.reset();
        if self.free.len() < self.capacity {
            self.free.push(matcher);
        }
    }

    /// Idle matchers ready to hand out.
    #[must_use]
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Matchers built since the pool was created.
    #[must_use]
    pub fn created(&self) -> usize {
        self.created
    }
}

impl Default for MatcherPool {
    fn default() -> Self {
        Self::new(blockclear_types::constants::DEFAULT_MATCHER_POOL_CAPACITY)
    }
}
