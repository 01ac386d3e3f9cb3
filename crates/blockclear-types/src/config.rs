//! Configuration for the execution pipeline.

use serde::{Deserialize, Serialize};

use crate::{BlockclearError, Result, constants};

/// What to do when the event sink rejects an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishFailurePolicy {
    /// Log the failure and keep settling.
    #[default]
    BestEffort,
    /// Fail the block.
    Abort,
}

/// Settings for `ExecutionKeeper`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub publish_failure_policy: PublishFailurePolicy,
    /// Matchers retained by the pool after release.
    pub matcher_pool_capacity: usize,
    /// Upper bound on time-in-force accepted at admission.
    pub max_time_in_force: u16,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            publish_failure_policy: PublishFailurePolicy::BestEffort,
            matcher_pool_capacity: constants::DEFAULT_MATCHER_POOL_CAPACITY,
            max_time_in_force: constants::MAX_TIME_IN_FORCE,
        }
    }
}

impl ExecutionConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_time_in_force == 0 {
            return Err(BlockclearError::Configuration(
                "max_time_in_force must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
