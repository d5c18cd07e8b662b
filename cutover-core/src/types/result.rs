//! Execution results returned by `execute` and `rollback`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CutoverPlan, StepStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// One entry of the run log carried in the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Plan state at the end of the run.
    pub plan: CutoverPlan,
    pub success: bool,
    pub rolled_back: bool,
    pub steps_completed: usize,
    pub steps_failed: usize,
    pub duration_ms: u64,
    pub logs: Vec<ExecutionLog>,
    #[serde(default)]
    pub manual_instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Log entries at `level` or above.
    pub fn logs_at_least(&self, level: LogLevel) -> impl Iterator<Item = &ExecutionLog> {
        self.logs.iter().filter(move |entry| entry.level >= level)
    }

    /// Warnings, e.g. changes that could not be reverted automatically.
    pub fn warnings(&self) -> Vec<&str> {
        self.logs
            .iter()
            .filter(|entry| entry.level == LogLevel::Warn)
            .map(|entry| entry.message.as_str())
            .collect()
    }

    pub(crate) fn count_steps(plan: &CutoverPlan) -> (usize, usize) {
        plan.steps.iter().fold((0, 0), |(done, failed), step| match step.status {
            StepStatus::Completed => (done + 1, failed),
            StepStatus::Failed => (done, failed + 1),
            _ => (done, failed),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::StepType;

    #[test]
    fn test_count_steps() {
        let mut plan = CutoverPlan::new("p", "b");
        plan.push_step(StepType::PreCheck, "a".into(), "a");
        plan.push_step(StepType::DnsChange, "b".into(), "b");
        plan.push_step(StepType::PostCheck, "c".into(), "c");
        plan.steps[0].complete("ok");
        plan.steps[1].fail("boom");
        plan.steps[2].skip("skipped");
        assert_eq!(ExecutionResult::count_steps(&plan), (1, 1));
    }

    #[test]
    fn test_log_filters() {
        let entry = |level, message: &str| ExecutionLog {
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
        };
        let result = ExecutionResult {
            plan: CutoverPlan::new("p", "b"),
            success: true,
            rolled_back: false,
            steps_completed: 0,
            steps_failed: 0,
            duration_ms: 0,
            logs: vec![
                entry(LogLevel::Debug, "d"),
                entry(LogLevel::Warn, "w"),
                entry(LogLevel::Error, "e"),
            ],
            manual_instructions: vec![],
            error: None,
        };
        assert_eq!(result.warnings(), vec!["w"]);
        assert_eq!(result.logs_at_least(LogLevel::Warn).count(), 2);
        assert_eq!(serde_json::to_value(LogLevel::Warn).unwrap(), "warn");
    }
}
