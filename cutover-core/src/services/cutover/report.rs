//! Run log and step hooks.

use chrono::Utc;

use crate::types::{
    CutoverPlan, CutoverStep, ExecuteOptions, ExecutionLog, LogLevel, ProgressHook, StepHook,
};

/// Collects the log entries returned in the result and mirrors them to `log`.
#[derive(Debug)]
pub(crate) struct RunLog {
    verbose: bool,
    entries: Vec<ExecutionLog>,
}

impl RunLog {
    pub(crate) fn new(verbose: bool) -> Self {
        Self {
            verbose,
            entries: Vec::new(),
        }
    }

    /// Kept in the result only when verbose.
    pub(crate) fn debug(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::debug!("[Cutover] {message}");
        if self.verbose {
            self.push(LogLevel::Debug, message);
        }
    }

    pub(crate) fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::info!("[Cutover] {message}");
        self.push(LogLevel::Info, message);
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("[Cutover] {message}");
        self.push(LogLevel::Warn, message);
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::error!("[Cutover] {message}");
        self.push(LogLevel::Error, message);
    }

    pub(crate) fn into_entries(self) -> Vec<ExecutionLog> {
        self.entries
    }

    fn push(&mut self, level: LogLevel, message: String) {
        self.entries.push(ExecutionLog {
            timestamp: Utc::now(),
            level,
            message,
        });
    }
}

/// Invokes the caller's hooks at step boundaries.
#[derive(Clone, Copy, Default)]
pub(crate) struct StepReporter<'a> {
    on_start: Option<&'a StepHook>,
    on_complete: Option<&'a StepHook>,
    on_progress: Option<&'a ProgressHook>,
}

impl<'a> StepReporter<'a> {
    pub(crate) fn from_options(options: &'a ExecuteOptions) -> Self {
        Self {
            on_start: options.on_step_start.as_ref(),
            on_complete: options.on_step_complete.as_ref(),
            on_progress: options.on_progress.as_ref(),
        }
    }

    pub(crate) fn started(&self, step: &CutoverStep) {
        if let Some(hook) = self.on_start {
            hook(step);
        }
    }

    /// Report the step at `index` as finished (completed, failed or skipped).
    pub(crate) fn finished(&self, plan: &CutoverPlan, index: usize) {
        let Some(step) = plan.steps.get(index) else {
            return;
        };
        if let Some(hook) = self.on_complete {
            hook(step);
        }
        if let Some(hook) = self.on_progress {
            let (done, total) = plan.step_progress();
            hook(done, total, &step.description);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::types::StepType;

    #[test]
    fn test_debug_entries_need_verbose() {
        let mut quiet = RunLog::new(false);
        quiet.debug("hidden");
        quiet.info("shown");
        assert_eq!(quiet.into_entries().len(), 1);

        let mut verbose = RunLog::new(true);
        verbose.debug("shown");
        verbose.warn("shown");
        let entries = verbose.into_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, LogLevel::Debug);
    }

    #[test]
    fn test_reporter_invokes_hooks() {
        let events = Arc::new(Mutex::new(Vec::<String>::new()));
        let (start_events, progress_events) = (events.clone(), events.clone());
        let options = ExecuteOptions {
            on_step_start: Some(Arc::new(move |step: &CutoverStep| {
                start_events.lock().unwrap().push(format!("start {}", step.reference_id));
            })),
            on_progress: Some(Arc::new(move |done, total, message: &str| {
                progress_events
                    .lock()
                    .unwrap()
                    .push(format!("{done}/{total} {message}"));
            })),
            ..ExecuteOptions::default()
        };

        let mut plan = CutoverPlan::new("p", "b");
        plan.push_step(StepType::PreCheck, "Check web".to_string(), "web");
        plan.push_step(StepType::PostCheck, "Check site".to_string(), "site");

        let reporter = StepReporter::from_options(&options);
        reporter.started(&plan.steps[0]);
        plan.steps[0].complete("ok");
        reporter.finished(&plan, 0);
        reporter.finished(&plan, 99);

        assert_eq!(
            *events.lock().unwrap(),
            vec!["start web".to_string(), "1/2 Check web".to_string()]
        );
    }

    #[test]
    fn test_rollback_steps_report_planned_totals() {
        let events = Arc::new(Mutex::new(Vec::<(usize, usize)>::new()));
        let sink = events.clone();
        let options = ExecuteOptions {
            on_progress: Some(Arc::new(move |done, total, _: &str| {
                sink.lock().unwrap().push((done, total));
            })),
            ..ExecuteOptions::default()
        };

        let mut plan = CutoverPlan::new("p", "b");
        plan.push_step(StepType::DnsChange, "Update c1".to_string(), "c1");
        plan.push_step(StepType::PostCheck, "Check site".to_string(), "site");
        plan.steps[0].complete("applied");
        plan.steps[1].fail("down");
        let revert = plan.push_step(StepType::Rollback, "Revert c1".to_string(), "c1");
        plan.steps[revert].fail("rejected");

        let reporter = StepReporter::from_options(&options);
        reporter.finished(&plan, 1);
        reporter.finished(&plan, revert);

        assert_eq!(*events.lock().unwrap(), vec![(2, 2), (2, 2)]);
    }
}
