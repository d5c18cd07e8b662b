//! The execute state machine.

use std::sync::Arc;
use std::time::Duration;

use cutover_provider::{describe_change, DnsProvider};
use tokio::time::{sleep, Instant};

use super::instructions::manual_instructions;
use super::report::{RunLog, StepReporter};
use super::{finish, CutoverOrchestrator, Outcome};
use crate::cancel::CancelToken;
use crate::types::{
    CutoverPlan, DnsChangeStatus, DnsQueryType, ExecuteOptions, ExecutionResult, PlanStatus,
    PropagationOptions, PropagationQuery, RollbackTrigger, StepType,
};

/// How the post-check phase ended.
enum PostChecks {
    Passed,
    /// Failures without an armed auto-rollback trigger.
    Failed(String),
    Triggered(String),
    Interrupted(String),
}

impl CutoverOrchestrator {
    /// Run a pending plan to completion.
    ///
    /// Never returns an error: every failure is reported in the
    /// [`ExecutionResult`] and on the plan. Plans that are rejected up front
    /// (not pending, invalid, unknown provider) are left untouched.
    pub async fn execute(
        &self,
        plan: &mut CutoverPlan,
        options: &ExecuteOptions,
        cancel: &CancelToken,
    ) -> ExecutionResult {
        let started = Instant::now();
        let mut log = RunLog::new(options.verbose);

        if plan.status != PlanStatus::Pending {
            let message = format!(
                "Plan '{}' is {}; only pending plans can be executed",
                plan.id, plan.status
            );
            log.error(&message);
            return finish(plan, log, started, Outcome::failed(message));
        }

        let errors = plan.validate();
        if !errors.is_empty() {
            for error in &errors {
                log.error(error);
            }
            let message = format!("Plan validation failed with {} error(s)", errors.len());
            return finish(plan, log, started, Outcome::failed(message));
        }

        let provider = match self.resolve_provider(options.provider_name()).await {
            Ok(provider) => provider,
            Err(e) => {
                log.error(e.to_string());
                return finish(plan, log, started, Outcome::failed(e.to_string()));
            }
        };

        plan.build_steps();
        if let Err(e) = plan.mark_running() {
            log.error(e.to_string());
            return finish(plan, log, started, Outcome::failed(e.to_string()));
        }

        let timeout = options.timeout.unwrap_or(plan.timeout);
        let dry_run = options.dry_run || plan.dry_run;
        let manual = options.manual || !provider.applies_changes();
        log.info(format!(
            "Executing plan '{}' ({} step(s)) with provider '{}'{}{}",
            plan.id,
            plan.steps.len(),
            options.provider_name(),
            if dry_run { ", dry run" } else { "" },
            if manual { ", manual mode" } else { "" }
        ));

        let mut run = Run {
            orchestrator: self,
            provider,
            cancel,
            reporter: StepReporter::from_options(options),
            log,
            deadline: Instant::now() + timeout,
            timeout,
            dry_run,
            skip_pre_check: options.skip_pre_check,
        };
        let outcome = run.drive(plan, manual).await;
        finish(plan, run.log, started, outcome)
    }
}

/// State of one `execute` call.
struct Run<'a> {
    orchestrator: &'a CutoverOrchestrator,
    provider: Arc<dyn DnsProvider>,
    cancel: &'a CancelToken,
    reporter: StepReporter<'a>,
    log: RunLog,
    deadline: Instant,
    timeout: Duration,
    dry_run: bool,
    skip_pre_check: bool,
}

impl Run<'_> {
    async fn drive(&mut self, plan: &mut CutoverPlan, manual: bool) -> Outcome {
        if let Err(reason) = self.pre_checks(plan).await {
            return self.fail_before_changes(plan, reason);
        }

        if manual {
            return self.manual(plan);
        }

        if let Err(reason) = self.dns_changes(plan).await {
            return self.fail_and_revert(plan, reason).await;
        }
        if let Err(reason) = self.propagation(plan).await {
            return self.fail_and_revert(plan, reason).await;
        }

        match self.post_checks(plan).await {
            PostChecks::Passed => {}
            PostChecks::Interrupted(reason) => return self.fail_and_revert(plan, reason).await,
            PostChecks::Triggered(reason) => return self.trigger_rollback(plan, reason).await,
            PostChecks::Failed(reason) => {
                self.log.error(format!(
                    "{reason}; DNS changes were left in place, manual rollback required"
                ));
                self.settle_failed(plan, &reason);
                return Outcome::failed(reason);
            }
        }

        if let Err(e) = plan.mark_completed() {
            self.log.error(e.to_string());
            return Outcome::failed(e.to_string());
        }
        self.log.info(format!("Cutover '{}' completed", plan.id));
        Outcome::succeeded()
    }

    // ===== Phases =====

    async fn pre_checks(&mut self, plan: &mut CutoverPlan) -> Result<(), String> {
        if self.skip_pre_check && !plan.pre_checks.is_empty() {
            self.log.warn("Pre-checks skipped by operator");
        }

        for index in step_indices(plan, StepType::PreCheck) {
            if let Some(reason) = self.interruption() {
                return Err(reason);
            }
            if self.skip_pre_check {
                plan.steps[index].skip("Pre-checks skipped by operator");
                self.reporter.finished(plan, index);
                continue;
            }

            self.begin(plan, index);
            let check_id = plan.steps[index].reference_id.clone();
            let Some(check) = plan.pre_checks.iter().find(|c| c.id == check_id).cloned() else {
                let reason = format!("Pre-check '{check_id}' is not part of the plan");
                plan.steps[index].fail(&reason);
                self.reporter.finished(plan, index);
                return Err(reason);
            };

            if self.dry_run {
                plan.steps[index].complete(format!(
                    "dry run: would run {} check against {}",
                    check.check_type,
                    check.target()
                ));
                self.reporter.finished(plan, index);
                continue;
            }

            let result = self.orchestrator.toolbox.run_health_check(&check).await;
            if result.passed {
                self.log
                    .info(format!("Pre-check '{}' passed: {}", check.id, result.detail));
                plan.steps[index].complete(result.detail);
                self.reporter.finished(plan, index);
            } else {
                let reason = format!("Pre-check '{}' failed: {}", check.id, result.detail);
                plan.steps[index].fail(result.detail);
                self.reporter.finished(plan, index);
                return Err(reason);
            }
        }
        Ok(())
    }

    fn manual(&mut self, plan: &mut CutoverPlan) -> Outcome {
        let instructions =
            manual_instructions(plan, self.orchestrator.settings.nameservers.first());

        for index in step_indices(plan, StepType::DnsChange) {
            let instruction = plan
                .dns_change(&plan.steps[index].reference_id)
                .map(describe_change)
                .unwrap_or_default();
            plan.steps[index].skip(format!("Manual: {instruction}"));
            self.reporter.finished(plan, index);
        }
        for index in step_indices(plan, StepType::PostCheck) {
            let target = plan
                .check(&plan.steps[index].reference_id)
                .map(|check| check.target())
                .unwrap_or_default();
            plan.steps[index].skip(format!("Manual: verify {target} once the records are live"));
            self.reporter.finished(plan, index);
        }

        self.log.info(format!(
            "Manual mode: {} DNS change(s) described, no provider call made",
            plan.dns_changes.len()
        ));
        if let Err(e) = plan.mark_completed() {
            self.log.error(e.to_string());
            return Outcome::failed(e.to_string());
        }
        Outcome {
            success: true,
            manual_instructions: instructions,
            ..Outcome::default()
        }
    }

    async fn dns_changes(&mut self, plan: &mut CutoverPlan) -> Result<(), String> {
        for index in step_indices(plan, StepType::DnsChange) {
            if let Some(reason) = self.interruption() {
                return Err(reason);
            }

            self.begin(plan, index);
            let change_id = plan.steps[index].reference_id.clone();
            let Some(position) = plan.dns_change_index(&change_id) else {
                let reason = format!("DNS change '{change_id}' is not part of the plan");
                plan.steps[index].fail(&reason);
                self.reporter.finished(plan, index);
                return Err(reason);
            };

            let change = &mut plan.dns_changes[position];
            let creating = change.old_value.is_empty();

            if self.dry_run {
                let output = format!(
                    "dry run: would {} {}",
                    if creating { "create" } else { "update" },
                    describe_change(change)
                );
                self.log.debug(&output);
                plan.steps[index].complete(output);
                self.reporter.finished(plan, index);
                continue;
            }

            let result = if creating {
                self.provider.create_record(change).await
            } else {
                self.provider.update_record(change).await
            };

            match result {
                Ok(()) => {
                    let output = format!(
                        "Applied {} (record {})",
                        describe_change(change),
                        change.provider_record_id
                    );
                    self.log.info(&output);
                    plan.steps[index].complete(output);
                    self.reporter.finished(plan, index);
                }
                Err(e) => {
                    change.mark_failed();
                    let reason = format!(
                        "DNS change '{change_id}' ({}) rejected by provider '{}': {e}",
                        change.describe(),
                        e.provider()
                    );
                    if e.is_expected() {
                        self.log.warn(&reason);
                    } else {
                        self.log.error(&reason);
                    }
                    plan.steps[index].fail(e.to_string());
                    self.reporter.finished(plan, index);
                    return Err(reason);
                }
            }
        }
        Ok(())
    }

    /// Wait for applied changes to show up on public resolvers.
    ///
    /// Not propagating in time is only a warning; only an interruption is an error.
    async fn propagation(&mut self, plan: &CutoverPlan) -> Result<(), String> {
        if self.dry_run {
            self.log.info("Dry run: skipping propagation wait");
            return Ok(());
        }
        if plan.dns_propagation_wait.is_zero() {
            self.log.debug("Propagation wait disabled for this plan");
            return Ok(());
        }

        let budget_ends = (Instant::now() + plan.dns_propagation_wait).min(self.deadline);
        let orchestrator = self.orchestrator;
        let settings = &orchestrator.settings;

        for change in &plan.dns_changes {
            if change.status != DnsChangeStatus::Applied {
                continue;
            }
            if let Some(reason) = self.interruption() {
                return Err(reason);
            }

            let label = change.describe();
            let record_type = match change.record_type.as_str().parse::<DnsQueryType>() {
                Ok(record_type) => record_type,
                Err(e) => {
                    self.log
                        .warn(format!("Cannot check propagation of {label}: {e}"));
                    continue;
                }
            };
            let remaining = budget_ends.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.log.warn(format!(
                    "Propagation budget used up before {label} could be checked"
                ));
                continue;
            }

            let query = PropagationQuery::new(change.fqdn(), record_type, &change.new_value);
            let options = PropagationOptions {
                nameservers: settings.nameservers.clone(),
                timeout: remaining,
                interval: settings.propagation_interval,
                quorum: settings.propagation_quorum,
            };

            let waited = tokio::select! {
                outcome = orchestrator.toolbox.wait_for_propagation(&query, &options) => {
                    Some(outcome)
                }
                () = self.cancel.cancelled() => None,
            };

            match waited {
                None => {
                    return Err(self
                        .interruption()
                        .unwrap_or_else(|| "Cutover cancelled".to_string()));
                }
                Some(Ok(outcome)) if outcome.propagated => {
                    self.log.info(format!(
                        "{label} propagated to {}/{} nameserver(s) in {}ms",
                        outcome.matched_count(),
                        options.nameservers.len(),
                        outcome.elapsed_ms
                    ));
                }
                Some(Ok(outcome)) => {
                    self.log.warn(format!(
                        "{label} did not propagate within {}s ({}/{} nameserver(s) matched), \
                         continuing with post-checks",
                        remaining.as_secs(),
                        outcome.matched_count(),
                        options.nameservers.len()
                    ));
                }
                Some(Err(e)) => {
                    self.log
                        .warn(format!("Propagation check for {label} failed: {e}"));
                }
            }
        }
        Ok(())
    }

    async fn post_checks(&mut self, plan: &mut CutoverPlan) -> PostChecks {
        let interval = self.orchestrator.settings.post_check_interval;
        let mut failed = Vec::new();

        for index in step_indices(plan, StepType::PostCheck) {
            if let Some(reason) = self.interruption() {
                return PostChecks::Interrupted(reason);
            }

            self.begin(plan, index);
            let check_id = plan.steps[index].reference_id.clone();
            let Some(check) = plan.post_checks.iter().find(|c| c.id == check_id).cloned() else {
                plan.steps[index].fail(format!("Post-check '{check_id}' is not part of the plan"));
                self.reporter.finished(plan, index);
                failed.push(check_id);
                continue;
            };

            if self.dry_run {
                plan.steps[index].complete(format!(
                    "dry run: would run {} check against {}",
                    check.check_type,
                    check.target()
                ));
                self.reporter.finished(plan, index);
                continue;
            }

            let triggers: Vec<RollbackTrigger> =
                plan.triggers_for(&check.id).into_iter().cloned().collect();
            let mut result = self.orchestrator.toolbox.run_health_check(&check).await;
            let mut consecutive = u32::from(!result.passed);

            // Re-run a watched check until it recovers or its triggers settle.
            while !result.passed && !triggers_settled(&triggers, consecutive) {
                let watching: Vec<String> = triggers
                    .iter()
                    .filter(|t| !t.is_tripped(consecutive))
                    .map(|t| format!("'{}' {consecutive}/{}", t.id, t.failure_threshold))
                    .collect();
                self.log.warn(format!(
                    "Post-check '{}' failed (trigger {}): {}",
                    check.id,
                    watching.join(", "),
                    result.detail
                ));
                if let Err(reason) = self.pause(interval).await {
                    plan.steps[index].fail(format!("{}; {reason}", result.detail));
                    self.reporter.finished(plan, index);
                    return PostChecks::Interrupted(reason);
                }
                result = self.orchestrator.toolbox.run_health_check(&check).await;
                consecutive = if result.passed { 0 } else { consecutive + 1 };
            }

            if result.passed {
                self.log
                    .info(format!("Post-check '{}' passed: {}", check.id, result.detail));
                plan.steps[index].complete(result.detail);
                self.reporter.finished(plan, index);
                continue;
            }

            plan.steps[index].fail(result.detail.clone());
            self.reporter.finished(plan, index);

            let tripped = triggers.iter().filter(|t| t.is_tripped(consecutive));
            if let Some(trigger) = tripped.clone().find(|t| t.auto_rollback) {
                return PostChecks::Triggered(format!(
                    "Rollback trigger '{}' fired: post-check '{}' failed {consecutive} \
                     consecutive time(s): {}",
                    trigger.id, check.id, result.detail
                ));
            }
            for trigger in tripped {
                self.log.error(format!(
                    "Rollback trigger '{}' reached its threshold but auto rollback is disabled",
                    trigger.id
                ));
            }
            self.log
                .error(format!("Post-check '{}' failed: {}", check.id, result.detail));
            failed.push(check.id);
        }

        if failed.is_empty() {
            PostChecks::Passed
        } else {
            PostChecks::Failed(format!("Post-check(s) failed: {}", failed.join(", ")))
        }
    }

    // ===== Endings =====

    /// Nothing was applied: fail without touching DNS.
    fn fail_before_changes(&mut self, plan: &mut CutoverPlan, reason: String) -> Outcome {
        self.log.error(format!("{reason}; no DNS change was attempted"));
        self.settle_failed(plan, &reason);
        Outcome::failed(reason)
    }

    /// DNS failure or interruption: fail, then revert what was applied.
    async fn fail_and_revert(&mut self, plan: &mut CutoverPlan, reason: String) -> Outcome {
        self.log.error(&reason);
        self.settle_failed(plan, &reason);

        self.log.warn("Reverting applied DNS changes");
        let report = self
            .orchestrator
            .revert_applied(
                plan,
                self.provider.as_ref(),
                self.dry_run,
                &mut self.log,
                &self.reporter,
            )
            .await;

        let rolled_back = report.is_clean() && report.reverted > 0;
        if rolled_back {
            if let Err(e) = plan.mark_rolled_back() {
                self.log.error(e.to_string());
            }
        } else if !report.is_clean() {
            plan.error = Some(format!(
                "{reason}; rollback incomplete for {}",
                report.failures.join(", ")
            ));
        }

        Outcome {
            rolled_back,
            error: Some(reason),
            ..Outcome::default()
        }
    }

    /// An auto-rollback trigger fired.
    async fn trigger_rollback(&mut self, plan: &mut CutoverPlan, reason: String) -> Outcome {
        self.log.warn(&reason);
        skip_pending(plan, "Skipped: rollback triggered");

        let report = self
            .orchestrator
            .revert_applied(
                plan,
                self.provider.as_ref(),
                self.dry_run,
                &mut self.log,
                &self.reporter,
            )
            .await;

        if report.is_clean() {
            plan.error = Some(reason.clone());
            if let Err(e) = plan.mark_rolled_back() {
                self.log.error(e.to_string());
            }
            self.log.info(format!("Cutover '{}' rolled back", plan.id));
            return Outcome {
                rolled_back: true,
                error: Some(reason),
                ..Outcome::default()
            };
        }

        let message = format!(
            "{reason}; rollback incomplete for {}",
            report.failures.join(", ")
        );
        if let Err(e) = plan.mark_failed(&message) {
            self.log.error(e.to_string());
        }
        Outcome::failed(message)
    }

    fn settle_failed(&mut self, plan: &mut CutoverPlan, reason: &str) {
        skip_pending(plan, "Skipped: cutover aborted");
        if let Err(e) = plan.mark_failed(reason) {
            self.log.error(e.to_string());
        }
    }

    // ===== Helpers =====

    fn begin(&self, plan: &mut CutoverPlan, index: usize) {
        plan.current_step_index = index;
        plan.steps[index].start();
        self.reporter.started(&plan.steps[index]);
    }

    /// Cancellation or deadline, whichever was observed.
    fn interruption(&self) -> Option<String> {
        if self.cancel.is_cancelled() {
            Some("Cutover cancelled".to_string())
        } else if Instant::now() >= self.deadline {
            Some(format!("Cutover timed out after {:?}", self.timeout))
        } else {
            None
        }
    }

    /// Sleep unless cancelled or past the deadline first.
    async fn pause(&self, duration: Duration) -> Result<(), String> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        tokio::select! {
            () = sleep(duration.min(remaining)) => {}
            () = self.cancel.cancelled() => {}
        }
        self.interruption().map_or(Ok(()), Err)
    }
}

/// An auto trigger fired, or every trigger reached its threshold. An empty set is settled.
fn triggers_settled(triggers: &[RollbackTrigger], consecutive: u32) -> bool {
    triggers
        .iter()
        .any(|t| t.auto_rollback && t.is_tripped(consecutive))
        || triggers.iter().all(|t| t.is_tripped(consecutive))
}

fn step_indices(plan: &CutoverPlan, step_type: StepType) -> Vec<usize> {
    plan.steps
        .iter()
        .enumerate()
        .filter(|(_, step)| step.step_type == step_type)
        .map(|(index, _)| index)
        .collect()
}

fn skip_pending(plan: &mut CutoverPlan, reason: &str) {
    for step in plan.steps.iter_mut().filter(|step| !step.is_finished()) {
        step.skip(reason);
    }
}
