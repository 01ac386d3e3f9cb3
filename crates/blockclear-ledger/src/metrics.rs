//! Recording metrics sink.

use std::time::Duration;

use blockclear_types::MetricsSink;

/// Stores every observation for later inspection.
#[derive(Debug, Default, Clone)]
pub struct MetricsRecorder {
    pub processing_times: Vec<Duration>,
    pub fills_processed: Vec<usize>,
}

impl MetricsRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills processed across all observed blocks.
    #[must_use]
    pub fn total_fills(&self) -> usize {
        self.fills_processed.iter().sum()
    }

    /// Blocks observed.
    #[must_use]
    pub fn blocks(&self) -> usize {
        self.processing_times.len()
    }
}

impl MetricsSink for MetricsRecorder {
    fn observe_processing_time(&mut self, elapsed: Duration) {
        self.processing_times.push(elapsed);
    }

    fn observe_fills_processed(&mut self, count: usize) {
        self.fills_processed.push(count);
    }
}
