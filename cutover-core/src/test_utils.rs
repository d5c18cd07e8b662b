//! 测试辅助模块
//!
//! Mock provider and toolbox gateway plus plan factories for orchestrator tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cutover_provider::{DnsProvider, ProviderError, Result as ProviderResult};
use tokio::sync::RwLock;

use crate::error::CoreResult;
use crate::services::CutoverOrchestrator;
use crate::traits::{InMemoryProviderRegistry, ToolboxGateway};
use crate::types::{
    CutoverPlan, DnsChange, DnsChangeStatus, DnsRecord, DnsRecordType, HealthCheck,
    HealthCheckResult, OrchestratorSettings, PropagationOptions, PropagationOutcome,
    PropagationQuery, ProviderMetadata, ProviderType,
};

// ===== MockProvider =====

/// Records every mutation as `"create <id>"`, `"update <id>"` or `"revert <id>"`.
///
/// A revert is an update whose change is already applied.
pub struct MockProvider {
    applies_changes: bool,
    calls: RwLock<Vec<String>>,
    /// Change ids whose apply fails
    fail_apply: RwLock<HashSet<String>>,
    /// Change ids whose revert fails
    fail_revert: RwLock<HashSet<String>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            applies_changes: true,
            calls: RwLock::new(Vec::new()),
            fail_apply: RwLock::new(HashSet::new()),
            fail_revert: RwLock::new(HashSet::new()),
        }
    }

    /// A provider that only describes changes, like the manual one.
    pub fn describing() -> Self {
        Self {
            applies_changes: false,
            ..Self::new()
        }
    }

    pub async fn fail_apply_of(&self, change_id: &str) {
        self.fail_apply.write().await.insert(change_id.to_string());
    }

    pub async fn fail_revert_of(&self, change_id: &str) {
        self.fail_revert.write().await.insert(change_id.to_string());
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }

    pub async fn mutation_count(&self) -> usize {
        self.calls.read().await.len()
    }

    async fn mutate(&self, verb: &str, change: &mut DnsChange) -> ProviderResult<()> {
        self.calls
            .write()
            .await
            .push(format!("{verb} {}", change.id));

        let failing = if verb == "revert" {
            &self.fail_revert
        } else {
            &self.fail_apply
        };
        if failing.read().await.contains(&change.id) {
            return Err(ProviderError::Unknown {
                provider: self.id().to_string(),
                raw_code: Some("500".to_string()),
                raw_message: format!("{verb} of {} rejected", change.id),
            });
        }

        change.mark_applied(self.id(), format!("rec-{}", change.id));
        Ok(())
    }
}

#[async_trait]
impl DnsProvider for MockProvider {
    fn id(&self) -> &'static str {
        "mock"
    }

    fn metadata() -> ProviderMetadata {
        ProviderMetadata {
            id: ProviderType::Manual,
            name: "Mock".to_string(),
            description: "Test provider".to_string(),
            required_fields: Vec::new(),
        }
    }

    fn applies_changes(&self) -> bool {
        self.applies_changes
    }

    async fn validate_credentials(&self) -> ProviderResult<bool> {
        Ok(true)
    }

    async fn list_records(&self, _domain: &str) -> ProviderResult<Vec<DnsRecord>> {
        Ok(Vec::new())
    }

    async fn get_record(&self, _domain: &str, record_id: &str) -> ProviderResult<DnsRecord> {
        Err(ProviderError::RecordNotFound {
            provider: self.id().to_string(),
            record_id: record_id.to_string(),
            raw_message: None,
        })
    }

    async fn create_record(&self, change: &mut DnsChange) -> ProviderResult<()> {
        self.mutate("create", change).await
    }

    async fn update_record(&self, change: &mut DnsChange) -> ProviderResult<()> {
        let verb = if change.status == DnsChangeStatus::Applied {
            "revert"
        } else {
            "update"
        };
        self.mutate(verb, change).await
    }

    async fn delete_record(&self, _domain: &str, record_id: &str) -> ProviderResult<()> {
        self.calls.write().await.push(format!("delete {record_id}"));
        Ok(())
    }
}

// ===== FakeGateway =====

/// Health results are scripted per check id and consumed in order; the last
/// scripted result repeats. Unscripted checks pass.
pub struct FakeGateway {
    health: RwLock<HashMap<String, VecDeque<bool>>>,
    health_calls: RwLock<Vec<String>>,
    propagated: RwLock<bool>,
    propagation_delay: RwLock<Option<Duration>>,
    propagation_calls: RwLock<Vec<PropagationQuery>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            health: RwLock::new(HashMap::new()),
            health_calls: RwLock::new(Vec::new()),
            propagated: RwLock::new(true),
            propagation_delay: RwLock::new(None),
            propagation_calls: RwLock::new(Vec::new()),
        }
    }

    pub async fn script_health(&self, check_id: &str, results: &[bool]) {
        self.health
            .write()
            .await
            .insert(check_id.to_string(), results.iter().copied().collect());
    }

    pub async fn set_propagated(&self, propagated: bool) {
        *self.propagated.write().await = propagated;
    }

    /// Make every propagation wait take `delay` (capped by its timeout).
    pub async fn set_propagation_delay(&self, delay: Duration) {
        *self.propagation_delay.write().await = Some(delay);
    }

    pub async fn health_calls(&self) -> Vec<String> {
        self.health_calls.read().await.clone()
    }

    pub async fn health_calls_for(&self, check_id: &str) -> usize {
        self.health_calls
            .read()
            .await
            .iter()
            .filter(|id| id.as_str() == check_id)
            .count()
    }

    pub async fn propagation_calls(&self) -> Vec<PropagationQuery> {
        self.propagation_calls.read().await.clone()
    }
}

#[async_trait]
impl ToolboxGateway for FakeGateway {
    async fn run_health_check(&self, check: &HealthCheck) -> HealthCheckResult {
        self.health_calls.write().await.push(check.id.clone());

        let passed = {
            let mut health = self.health.write().await;
            match health.get_mut(&check.id) {
                Some(script) if script.len() > 1 => script.pop_front().unwrap_or(true),
                Some(script) => script.front().copied().unwrap_or(true),
                None => true,
            }
        };

        if passed {
            HealthCheckResult::passed(&check.id, "scripted pass")
        } else {
            HealthCheckResult::failed(&check.id, "scripted failure")
        }
    }

    async fn wait_for_propagation(
        &self,
        query: &PropagationQuery,
        options: &PropagationOptions,
    ) -> CoreResult<PropagationOutcome> {
        self.propagation_calls.write().await.push(query.clone());
        if let Some(delay) = *self.propagation_delay.read().await {
            tokio::time::sleep(delay.min(options.timeout)).await;
        }
        Ok(PropagationOutcome {
            propagated: *self.propagated.read().await,
            rounds: 1,
            results: Vec::new(),
            elapsed_ms: 0,
        })
    }
}

// ===== Factories =====

/// Settings with short waits so trigger polling stays fast.
pub fn fast_settings() -> OrchestratorSettings {
    OrchestratorSettings {
        post_check_interval: Duration::from_millis(5),
        propagation_interval: Duration::from_millis(5),
        ..OrchestratorSettings::default()
    }
}

/// Orchestrator with `MockProvider` registered as `"mock"`.
pub async fn create_test_orchestrator() -> (CutoverOrchestrator, Arc<MockProvider>, Arc<FakeGateway>)
{
    create_test_orchestrator_with(MockProvider::new()).await
}

pub async fn create_test_orchestrator_with(
    provider: MockProvider,
) -> (CutoverOrchestrator, Arc<MockProvider>, Arc<FakeGateway>) {
    let provider = Arc::new(provider);
    let gateway = Arc::new(FakeGateway::new());
    let orchestrator = CutoverOrchestrator::new(
        Arc::new(InMemoryProviderRegistry::new()),
        gateway.clone(),
        fast_settings(),
    )
    .await;
    orchestrator.register_provider("mock", provider.clone()).await;
    (orchestrator, provider, gateway)
}

pub fn a_change(id: &str, name: &str, old: &str, new: &str) -> DnsChange {
    DnsChange::new(id, "example.com", DnsRecordType::A, name, new).with_old_value(old)
}

pub fn http_check(id: &str) -> HealthCheck {
    HealthCheck::http(id, id, format!("https://{id}.example.com/health"))
}

/// One pre-check `pre`, the given changes, one post-check `post`.
pub fn test_plan(changes: Vec<DnsChange>) -> CutoverPlan {
    let mut plan = CutoverPlan::new("plan-1", "bundle-1");
    plan.add_pre_check(http_check("pre"));
    for change in changes {
        plan.add_dns_change(change);
    }
    plan.add_post_check(http_check("post"));
    plan.dns_propagation_wait = Duration::from_secs(1);
    plan
}
