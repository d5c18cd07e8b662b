//! Reverting applied DNS changes.

use cutover_provider::DnsProvider;
use tokio::time::Instant;

use super::report::{RunLog, StepReporter};
use super::{finish, CutoverOrchestrator, Outcome};
use crate::error::{CoreError, CoreResult};
use crate::types::{
    CutoverPlan, DnsChangeStatus, ExecutionResult, PlanStatus, RollbackOptions, StepType,
};

/// What one pass over the plan's changes achieved.
#[derive(Debug, Default)]
pub(super) struct RollbackReport {
    pub reverted: usize,
    /// Applied changes without a captured old value.
    pub unrevertable: Vec<String>,
    /// Changes whose revert the provider rejected.
    pub failures: Vec<String>,
}

impl RollbackReport {
    /// Every revertible change was reverted.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl CutoverOrchestrator {
    /// Revert every applied change of an executed plan.
    ///
    /// Rolling back a plan that is already rolled back, or one that never
    /// applied a DNS change (manual mode, early failure), is a no-op and leaves
    /// the status alone. Plans that never ran are refused with
    /// [`CoreError::InvalidState`].
    pub async fn rollback(
        &self,
        plan: &mut CutoverPlan,
        options: &RollbackOptions,
    ) -> CoreResult<ExecutionResult> {
        let started = Instant::now();
        let mut log = RunLog::new(options.verbose);

        if plan.status == PlanStatus::RolledBack {
            log.info(format!("Plan '{}' is already rolled back, nothing to do", plan.id));
            return Ok(finish(
                plan,
                log,
                started,
                Outcome {
                    success: true,
                    rolled_back: true,
                    ..Outcome::default()
                },
            ));
        }
        if !plan.can_rollback() {
            return Err(CoreError::InvalidState(format!(
                "plan '{}' is {}; only running, completed or failed plans can be rolled back",
                plan.id, plan.status
            )));
        }

        let touched = plan.dns_changes.iter().any(|c| {
            matches!(
                c.status,
                DnsChangeStatus::Applied | DnsChangeStatus::RolledBack
            )
        });
        if !touched {
            log.info(format!(
                "Plan '{}' never applied a DNS change, nothing to roll back",
                plan.id
            ));
            return Ok(finish(plan, log, started, Outcome::succeeded()));
        }

        let provider = self.resolve_provider(options.provider_name()).await?;
        log.info(format!(
            "Rolling back plan '{}' with provider '{}'{}",
            plan.id,
            options.provider_name(),
            if options.dry_run { " (dry run)" } else { "" }
        ));

        let report = self
            .revert_applied(
                plan,
                provider.as_ref(),
                options.dry_run,
                &mut log,
                &StepReporter::default(),
            )
            .await;

        if !report.unrevertable.is_empty() {
            log.warn(format!(
                "{} change(s) must be cleaned up by hand: {}",
                report.unrevertable.len(),
                report.unrevertable.join(", ")
            ));
        }

        if !report.is_clean() {
            let message = format!(
                "Rollback incomplete: {} change(s) could not be reverted ({})",
                report.failures.len(),
                report.failures.join(", ")
            );
            log.error(&message);
            plan.error = Some(message.clone());
            return Ok(finish(plan, log, started, Outcome::failed(message)));
        }

        if options.dry_run {
            log.info("Dry run: plan status left unchanged");
            return Ok(finish(plan, log, started, Outcome::succeeded()));
        }

        plan.mark_rolled_back()?;
        log.info(format!(
            "Plan '{}' rolled back ({} change(s) reverted)",
            plan.id, report.reverted
        ));
        Ok(finish(
            plan,
            log,
            started,
            Outcome {
                success: true,
                rolled_back: true,
                ..Outcome::default()
            },
        ))
    }

    /// Walk the changes in reverse and restore each applied one to its old value.
    ///
    /// Shared by implicit rollback (DNS failure, interruption), trigger-fired
    /// rollback and operator rollback. Appends one rollback step per revert
    /// attempted. Never touches the plan status.
    pub(super) async fn revert_applied(
        &self,
        plan: &mut CutoverPlan,
        provider: &dyn DnsProvider,
        dry_run: bool,
        log: &mut RunLog,
        reporter: &StepReporter<'_>,
    ) -> RollbackReport {
        let mut report = RollbackReport::default();

        for index in (0..plan.dns_changes.len()).rev() {
            let change = &plan.dns_changes[index];
            match change.status {
                DnsChangeStatus::Applied => {}
                DnsChangeStatus::RolledBack => {
                    log.debug(format!("DNS change '{}' already rolled back", change.id));
                    continue;
                }
                DnsChangeStatus::Pending | DnsChangeStatus::Failed => {
                    log.warn(format!(
                        "DNS change '{}' ({}) was never applied, skipping",
                        change.id,
                        change.describe()
                    ));
                    continue;
                }
            }

            if change.old_value.is_empty() {
                log.warn(format!(
                    "DNS change '{}' ({}) has no previous value and cannot be reverted \
                     automatically; remove {} by hand",
                    change.id,
                    change.describe(),
                    change.new_value
                ));
                report.unrevertable.push(change.id.clone());
                continue;
            }

            let change_id = change.id.clone();
            let description = format!("Revert {} to {}", change.describe(), change.old_value);
            let step = plan.push_step(StepType::Rollback, description, &change_id);
            plan.current_step_index = step;
            plan.steps[step].start();
            reporter.started(&plan.steps[step]);

            if dry_run {
                let output = format!(
                    "dry run: would restore {} to {}",
                    plan.dns_changes[index].describe(),
                    plan.dns_changes[index].old_value
                );
                log.info(&output);
                plan.steps[step].complete(output);
                reporter.finished(plan, step);
                continue;
            }

            let mut revert = plan.dns_changes[index].reverted();
            match provider.update_record(&mut revert).await {
                Ok(()) => {
                    let change = &mut plan.dns_changes[index];
                    change.mark_rolled_back();
                    let output = format!("Restored {} to {}", change.describe(), change.old_value);
                    log.info(&output);
                    plan.steps[step].complete(output);
                    report.reverted += 1;
                }
                Err(e) => {
                    log.error(format!(
                        "Failed to revert DNS change '{change_id}' ({}): {e}",
                        plan.dns_changes[index].describe()
                    ));
                    plan.steps[step].fail(e.to_string());
                    report.failures.push(change_id);
                }
            }
            reporter.finished(plan, step);
        }

        report
    }
}
