//! Cutover orchestrator: runs a plan's pre-checks, DNS changes and
//! post-checks, and reverts applied changes when the run goes wrong.

mod execute;
mod instructions;
mod report;
mod rollback;


use std::sync::Arc;

use cutover_provider::{DnsProvider, ManualProvider};
use tokio::time::Instant;

use crate::error::{CoreError, CoreResult};
use crate::traits::{
    DefaultToolboxGateway, InMemoryProviderRegistry, ProviderRegistry, ToolboxGateway,
};
use crate::types::{CutoverPlan, ExecutionResult, OrchestratorSettings, MANUAL_PROVIDER};

use report::RunLog;

/// Drives cutover plans against registered DNS providers.
///
/// The orchestrator owns no plan state; every call works on the plan it is
/// handed and leaves the final statuses on it.
pub struct CutoverOrchestrator {
    registry: Arc<dyn ProviderRegistry>,
    toolbox: Arc<dyn ToolboxGateway>,
    settings: OrchestratorSettings,
}

impl CutoverOrchestrator {
    /// Build an orchestrator; the manual provider is registered as `"manual"`.
    pub async fn new(
        registry: Arc<dyn ProviderRegistry>,
        toolbox: Arc<dyn ToolboxGateway>,
        settings: OrchestratorSettings,
    ) -> Self {
        registry
            .register(MANUAL_PROVIDER.to_string(), Arc::new(ManualProvider::new()))
            .await;
        Self {
            registry,
            toolbox,
            settings,
        }
    }

    /// In-memory registry, live network checks.
    pub async fn with_settings(settings: OrchestratorSettings) -> Self {
        Self::new(
            Arc::new(InMemoryProviderRegistry::new()),
            Arc::new(DefaultToolboxGateway),
            settings,
        )
        .await
    }

    pub async fn register_provider(
        &self,
        name: impl Into<String>,
        provider: Arc<dyn DnsProvider>,
    ) {
        self.registry.register(name.into(), provider).await;
    }

    /// Registered provider names, sorted.
    pub async fn provider_names(&self) -> Vec<String> {
        self.registry.list_names().await
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    async fn resolve_provider(&self, name: &str) -> CoreResult<Arc<dyn DnsProvider>> {
        self.registry
            .get(name)
            .await
            .ok_or_else(|| CoreError::ProviderNotFound(name.to_string()))
    }
}

/// How a run ended, before the result is assembled.
#[derive(Debug, Default)]
struct Outcome {
    success: bool,
    rolled_back: bool,
    manual_instructions: Vec<String>,
    error: Option<String>,
}

impl Outcome {
    fn succeeded() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

fn finish(plan: &CutoverPlan, log: RunLog, started: Instant, outcome: Outcome) -> ExecutionResult {
    let (steps_completed, steps_failed) = ExecutionResult::count_steps(plan);
    #[allow(clippy::cast_possible_truncation)]
    let duration_ms = started.elapsed().as_millis() as u64;
    ExecutionResult {
        plan: plan.clone(),
        success: outcome.success,
        rolled_back: outcome.rolled_back,
        steps_completed,
        steps_failed,
        duration_ms,
        logs: log.into_entries(),
        manual_instructions: outcome.manual_instructions,
        error: outcome.error,
    }
}
