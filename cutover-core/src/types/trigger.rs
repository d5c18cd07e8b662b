//! Rollback triggers.

use serde::{Deserialize, Serialize};

fn default_failure_threshold() -> u32 {
    3
}

/// Rolls the cutover back after `failure_threshold` consecutive failures of a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackTrigger {
    pub id: String,
    /// Id of the health check this trigger watches.
    #[serde(alias = "reference_id")]
    pub check_id: String,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default)]
    pub auto_rollback: bool,
}

impl RollbackTrigger {
    pub fn new(
        id: impl Into<String>,
        check_id: impl Into<String>,
        failure_threshold: u32,
        auto_rollback: bool,
    ) -> Self {
        Self {
            id: id.into(),
            check_id: check_id.into(),
            failure_threshold,
            auto_rollback,
        }
    }

    /// Whether `consecutive_failures` reaches the threshold.
    pub fn is_tripped(&self, consecutive_failures: u32) -> bool {
        consecutive_failures >= self.failure_threshold.max(1)
    }
}
