//! Cutover plan: the checks, DNS changes and triggers of one run, plus its
//! execution state.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cutover_provider::{describe_change, DnsChange};
use cutover_toolbox::HealthCheck;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{CutoverStep, RollbackTrigger, StepStatus, StepType};
use crate::utils::duration_secs;

/// Overall status of a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    #[default]
    Pending,
    Running,
    Completed,
    RolledBack,
    Failed,
}

impl PlanStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::RolledBack | Self::Failed)
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::RolledBack => "rolled_back",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_dns_propagation_wait() -> Duration {
    Duration::from_secs(5 * 60)
}

/// A single cutover. Plans are one-shot: re-running needs a fresh plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutoverPlan {
    pub id: String,
    /// Bundle the plan was generated from.
    pub bundle_id: String,
    #[serde(default)]
    pub pre_checks: Vec<HealthCheck>,
    #[serde(default)]
    pub dns_changes: Vec<DnsChange>,
    #[serde(default)]
    pub post_checks: Vec<HealthCheck>,
    #[serde(default)]
    pub rollback_triggers: Vec<RollbackTrigger>,
    #[serde(default)]
    pub steps: Vec<CutoverStep>,
    #[serde(default)]
    pub current_step_index: usize,
    #[serde(default)]
    pub status: PlanStatus,
    /// Upper bound for the whole run.
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,
    /// Budget shared by all propagation waits.
    #[serde(default = "default_dns_propagation_wait", with = "duration_secs")]
    pub dns_propagation_wait: Duration,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolled_back_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CutoverPlan {
    pub fn new(id: impl Into<String>, bundle_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            bundle_id: bundle_id.into(),
            pre_checks: Vec::new(),
            dns_changes: Vec::new(),
            post_checks: Vec::new(),
            rollback_triggers: Vec::new(),
            steps: Vec::new(),
            current_step_index: 0,
            status: PlanStatus::Pending,
            timeout: default_timeout(),
            dns_propagation_wait: default_dns_propagation_wait(),
            dry_run: false,
            created_at: now,
            updated_at: now,
            executed_at: None,
            completed_at: None,
            rolled_back_at: None,
            error: None,
        }
    }

    /// Parse a plan document.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    // ===== Building =====

    pub fn add_pre_check(&mut self, check: HealthCheck) {
        self.pre_checks.push(check);
        self.touch();
    }

    pub fn add_dns_change(&mut self, change: DnsChange) {
        self.dns_changes.push(change);
        self.touch();
    }

    pub fn add_post_check(&mut self, check: HealthCheck) {
        self.post_checks.push(check);
        self.touch();
    }

    pub fn add_rollback_trigger(&mut self, trigger: RollbackTrigger) {
        self.rollback_triggers.push(trigger);
        self.touch();
    }

    /// Rebuild the step list from the current checks and changes.
    ///
    /// Order: pre-checks, DNS changes, post-checks. Previous steps are discarded.
    pub fn build_steps(&mut self) {
        let mut steps = Vec::with_capacity(
            self.pre_checks.len() + self.dns_changes.len() + self.post_checks.len(),
        );
        for check in &self.pre_checks {
            steps.push(CutoverStep::new(
                steps.len(),
                StepType::PreCheck,
                format!("Pre-check {} ({} {})", check.name, check.check_type, check.target()),
                &check.id,
            ));
        }
        for change in &self.dns_changes {
            steps.push(CutoverStep::new(
                steps.len(),
                StepType::DnsChange,
                describe_change(change),
                &change.id,
            ));
        }
        for check in &self.post_checks {
            steps.push(CutoverStep::new(
                steps.len(),
                StepType::PostCheck,
                format!("Post-check {} ({} {})", check.name, check.check_type, check.target()),
                &check.id,
            ));
        }
        self.steps = steps;
        self.current_step_index = 0;
        self.touch();
    }

    /// Append a step to the end of the list (rollback steps).
    pub fn push_step(
        &mut self,
        step_type: StepType,
        description: String,
        reference_id: &str,
    ) -> usize {
        let order = self.steps.len();
        self.steps
            .push(CutoverStep::new(order, step_type, description, reference_id));
        order
    }

    // ===== Validation =====

    /// Human-readable validation messages; empty when the plan can run.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.id.trim().is_empty() {
            errors.push("Plan id is required".to_string());
        }
        if self.bundle_id.trim().is_empty() {
            errors.push("Plan bundle id is required".to_string());
        }
        if self.dns_changes.is_empty() {
            errors.push("Plan must contain at least one DNS change".to_string());
        }
        if self.timeout.is_zero() {
            errors.push("Plan timeout must be positive".to_string());
        }

        for change in &self.dns_changes {
            errors.extend(change.validate());
        }
        for check in self.pre_checks.iter().chain(&self.post_checks) {
            errors.extend(check.validate());
        }

        check_unique("pre-check", self.pre_checks.iter().map(|c| c.id.as_str()), &mut errors);
        check_unique("DNS change", self.dns_changes.iter().map(|c| c.id.as_str()), &mut errors);
        check_unique("post-check", self.post_checks.iter().map(|c| c.id.as_str()), &mut errors);
        check_unique(
            "rollback trigger",
            self.rollback_triggers.iter().map(|t| t.id.as_str()),
            &mut errors,
        );

        for trigger in &self.rollback_triggers {
            if self.check(&trigger.check_id).is_none() {
                errors.push(format!(
                    "Rollback trigger '{}': references unknown check '{}'",
                    trigger.id, trigger.check_id
                ));
            }
            if trigger.failure_threshold == 0 {
                errors.push(format!(
                    "Rollback trigger '{}': failure threshold must be at least 1",
                    trigger.id
                ));
            }
        }

        errors
    }

    // ===== Lookups =====

    pub fn dns_change(&self, id: &str) -> Option<&DnsChange> {
        self.dns_changes.iter().find(|c| c.id == id)
    }

    pub fn dns_change_mut(&mut self, id: &str) -> Option<&mut DnsChange> {
        self.dns_changes.iter_mut().find(|c| c.id == id)
    }

    pub(crate) fn dns_change_index(&self, id: &str) -> Option<usize> {
        self.dns_changes.iter().position(|c| c.id == id)
    }

    /// Pre- or post-check by id.
    pub fn check(&self, id: &str) -> Option<&HealthCheck> {
        self.pre_checks
            .iter()
            .chain(&self.post_checks)
            .find(|c| c.id == id)
    }

    /// Every trigger watching the given check, in plan order.
    pub fn triggers_for(&self, check_id: &str) -> Vec<&RollbackTrigger> {
        self.rollback_triggers
            .iter()
            .filter(|t| t.check_id == check_id)
            .collect()
    }

    // ===== State =====

    pub fn has_auto_rollback(&self) -> bool {
        self.rollback_triggers.iter().any(|t| t.auto_rollback)
    }

    pub fn can_rollback(&self) -> bool {
        matches!(
            self.status,
            PlanStatus::Running | PlanStatus::Completed | PlanStatus::Failed
        )
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Percentage of completed planned steps, 0 when no steps are built.
    ///
    /// Rollback steps appended during a run are not counted.
    pub fn progress(&self) -> u8 {
        let (total, completed) = self
            .planned_steps()
            .fold((0, 0), |(total, completed), step| {
                (total + 1, completed + usize::from(step.status == StepStatus::Completed))
            });
        if total == 0 {
            return 0;
        }
        u8::try_from(completed * 100 / total).unwrap_or(100)
    }

    /// `(finished, total)` over the planned steps.
    pub(crate) fn step_progress(&self) -> (usize, usize) {
        self.planned_steps()
            .fold((0, 0), |(finished, total), step| {
                (finished + usize::from(step.is_finished()), total + 1)
            })
    }

    fn planned_steps(&self) -> impl Iterator<Item = &CutoverStep> {
        self.steps
            .iter()
            .filter(|s| s.step_type != StepType::Rollback)
    }

    pub fn mark_running(&mut self) -> CoreResult<()> {
        self.transition(PlanStatus::Running, &[PlanStatus::Pending])?;
        self.executed_at = Some(Utc::now());
        Ok(())
    }

    pub fn mark_completed(&mut self) -> CoreResult<()> {
        self.transition(PlanStatus::Completed, &[PlanStatus::Running])?;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) -> CoreResult<()> {
        self.transition(PlanStatus::Failed, &[PlanStatus::Running])?;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn mark_rolled_back(&mut self) -> CoreResult<()> {
        self.transition(
            PlanStatus::RolledBack,
            &[PlanStatus::Running, PlanStatus::Completed, PlanStatus::Failed],
        )?;
        self.rolled_back_at = Some(Utc::now());
        Ok(())
    }

    fn transition(&mut self, to: PlanStatus, allowed_from: &[PlanStatus]) -> CoreResult<()> {
        if !allowed_from.contains(&self.status) {
            return Err(CoreError::InvalidState(format!(
                "plan '{}' cannot move from {} to {to}",
                self.id, self.status
            )));
        }
        self.status = to;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn check_unique<'a>(kind: &str, ids: impl Iterator<Item = &'a str>, errors: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for id in ids {
        if !id.is_empty() && !seen.insert(id) {
            errors.push(format!("Duplicate {kind} id '{id}'"));
        }
    }
}
