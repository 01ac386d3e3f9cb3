//! Recording event sink.

use blockclear_types::{BlockclearError, Event, EventSink, Result};

/// Keeps every published event in order.
///
/// Can be told to reject publishes, to exercise publish-failure handling.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<Event>,
    failing: bool,
    rejected: usize,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every publish from now on while `failing` is set.
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Publishes refused while failing.
    #[must_use]
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn batches(&self) -> impl Iterator<Item = &blockclear_types::Batch> {
        self.events.iter().filter_map(Event::as_batch)
    }

    pub fn fills(&self) -> impl Iterator<Item = &blockclear_types::FillEvent> {
        self.events.iter().filter_map(Event::as_fill)
    }

    /// Drain recorded events.
    pub fn take(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

impl EventSink for EventLog {
    fn publish(&mut self, event: Event) -> Result<()> {
        if self.failing {
            self.rejected += 1;
            return Err(BlockclearError::PublishFailed {
                reason: "event log is rejecting publishes".into(),
            });
        }
        self.events.push(event);
        Ok(())
    }
}
