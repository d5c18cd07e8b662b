//! Execution-tracking steps derived from a plan.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phase a step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    PreCheck,
    DnsChange,
    PostCheck,
    Rollback,
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PreCheck => "pre_check",
            Self::DnsChange => "dns_change",
            Self::PostCheck => "post_check",
            Self::Rollback => "rollback",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// One unit of work in a run.
///
/// `reference_id` points at the health check or DNS change the step tracks;
/// the referenced object is looked up on the plan, never copied here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutoverStep {
    pub order: usize,
    pub step_type: StepType,
    pub description: String,
    #[serde(default)]
    pub status: StepStatus,
    pub reference_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl CutoverStep {
    pub fn new(
        order: usize,
        step_type: StepType,
        description: impl Into<String>,
        reference_id: impl Into<String>,
    ) -> Self {
        Self {
            order,
            step_type,
            description: description.into(),
            status: StepStatus::Pending,
            reference_id: reference_id.into(),
            started_at: None,
            completed_at: None,
            duration_ms: None,
            error: None,
            output: None,
        }
    }

    pub fn start(&mut self) {
        self.status = StepStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn complete(&mut self, output: impl Into<String>) {
        self.finish(StepStatus::Completed);
        self.output = Some(output.into());
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.finish(StepStatus::Failed);
        self.error = Some(error.into());
    }

    /// Mark a step that never ran.
    pub fn skip(&mut self, reason: impl Into<String>) {
        self.status = StepStatus::Skipped;
        self.output = Some(reason.into());
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.status,
            StepStatus::Completed | StepStatus::Failed | StepStatus::Skipped
        )
    }

    fn finish(&mut self, status: StepStatus) {
        let now = Utc::now();
        self.status = status;
        self.completed_at = Some(now);
        self.duration_ms = self
            .started_at
            .and_then(|started| u64::try_from((now - started).num_milliseconds()).ok());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_step_lifecycle() {
        let mut step = CutoverStep::new(0, StepType::PreCheck, "Check web", "web");
        assert_eq!(step.status, StepStatus::Pending);
        assert!(!step.is_finished());

        step.start();
        assert_eq!(step.status, StepStatus::Running);
        assert!(step.started_at.is_some());

        step.complete("HTTP 200");
        assert_eq!(step.status, StepStatus::Completed);
        assert_eq!(step.output.as_deref(), Some("HTTP 200"));
        assert!(step.duration_ms.is_some());
        assert!(step.is_finished());
    }

    #[test]
    fn test_skip_has_no_timing() {
        let mut step = CutoverStep::new(3, StepType::DnsChange, "Update A example.com", "c1");
        step.skip("pre-check failed");
        assert_eq!(step.status, StepStatus::Skipped);
        assert!(step.completed_at.is_none());
        assert!(step.duration_ms.is_none());
    }

    #[test]
    fn test_step_type_serde() {
        assert_eq!(
            serde_json::to_string(&StepType::PostCheck).unwrap(),
            "\"post_check\""
        );
        assert_eq!(StepType::Rollback.to_string(), "rollback");
    }
}
