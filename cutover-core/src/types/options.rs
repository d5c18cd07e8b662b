//! Per-run options and orchestrator settings.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cutover_toolbox::{default_nameservers, PropagationServer, Quorum};

use crate::types::CutoverStep;

/// Provider used when none is named.
pub const MANUAL_PROVIDER: &str = "manual";

/// Called with the step that starts or finishes.
pub type StepHook = Arc<dyn Fn(&CutoverStep) + Send + Sync>;

/// Called with `(finished_steps, total_steps, message)`.
pub type ProgressHook = Arc<dyn Fn(usize, usize, &str) + Send + Sync>;

/// Options for one `execute` call.
///
/// Hooks run inline on the orchestrator's task and must return quickly.
#[derive(Clone, Default)]
pub struct ExecuteOptions {
    /// Simulate every provider and health call.
    pub dry_run: bool,
    /// Registry name of the provider; empty means `"manual"`.
    pub dns_provider: String,
    /// Emit instructions instead of calling the provider.
    pub manual: bool,
    /// Overrides `plan.timeout`.
    pub timeout: Option<Duration>,
    /// Keep debug entries in the result log.
    pub verbose: bool,
    pub skip_pre_check: bool,
    pub on_step_start: Option<StepHook>,
    pub on_step_complete: Option<StepHook>,
    pub on_progress: Option<ProgressHook>,
}

impl ExecuteOptions {
    pub fn provider_name(&self) -> &str {
        provider_or_manual(&self.dns_provider)
    }
}

impl fmt::Debug for ExecuteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecuteOptions")
            .field("dry_run", &self.dry_run)
            .field("dns_provider", &self.dns_provider)
            .field("manual", &self.manual)
            .field("timeout", &self.timeout)
            .field("verbose", &self.verbose)
            .field("skip_pre_check", &self.skip_pre_check)
            .field("on_step_start", &self.on_step_start.is_some())
            .field("on_step_complete", &self.on_step_complete.is_some())
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

/// Options for an operator-initiated `rollback`.
#[derive(Debug, Clone, Default)]
pub struct RollbackOptions {
    /// Registry name of the provider; empty means `"manual"`.
    pub dns_provider: String,
    pub dry_run: bool,
    pub verbose: bool,
}

impl RollbackOptions {
    pub fn provider_name(&self) -> &str {
        provider_or_manual(&self.dns_provider)
    }
}

fn provider_or_manual(name: &str) -> &str {
    let name = name.trim();
    if name.is_empty() {
        MANUAL_PROVIDER
    } else {
        name
    }
}

/// Orchestrator-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Pause between re-runs of a failing post-check watched by a trigger.
    pub post_check_interval: Duration,
    /// Pause between propagation rounds.
    pub propagation_interval: Duration,
    pub propagation_quorum: Quorum,
    pub nameservers: Vec<PropagationServer>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            post_check_interval: Duration::from_secs(10),
            propagation_interval: Duration::from_secs(10),
            propagation_quorum: Quorum::All,
            nameservers: default_nameservers(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name_defaults_to_manual() {
        assert_eq!(ExecuteOptions::default().provider_name(), "manual");
        let options = ExecuteOptions {
            dns_provider: " cloudflare ".to_string(),
            ..ExecuteOptions::default()
        };
        assert_eq!(options.provider_name(), "cloudflare");
        assert_eq!(RollbackOptions::default().provider_name(), "manual");
    }

    #[test]
    fn test_debug_hides_hooks() {
        let options = ExecuteOptions {
            on_progress: Some(Arc::new(|_, _, _| {})),
            ..ExecuteOptions::default()
        };
        let debug = format!("{options:?}");
        assert!(debug.contains("on_progress: true"));
        assert!(debug.contains("on_step_start: false"));
    }

    #[test]
    fn test_default_settings() {
        let settings = OrchestratorSettings::default();
        assert_eq!(settings.post_check_interval, Duration::from_secs(10));
        assert_eq!(settings.propagation_quorum, Quorum::All);
        assert_eq!(settings.nameservers.len(), 3);
    }
}
