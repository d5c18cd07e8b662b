//! Seam between the orchestrator and the network checks.

use async_trait::async_trait;
use cutover_toolbox::{
    HealthCheck, HealthCheckResult, PropagationOptions, PropagationOutcome, PropagationQuery,
    ToolboxService,
};

use crate::error::CoreResult;

/// Health and propagation checks used by the orchestrator.
///
/// [`DefaultToolboxGateway`] forwards to [`ToolboxService`]; tests plug in
/// scripted implementations.
#[async_trait]
pub trait ToolboxGateway: Send + Sync {
    async fn run_health_check(&self, check: &HealthCheck) -> HealthCheckResult;

    async fn wait_for_propagation(
        &self,
        query: &PropagationQuery,
        options: &PropagationOptions,
    ) -> CoreResult<PropagationOutcome>;
}

/// Gateway backed by real HTTP/TCP checks and hickory lookups.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultToolboxGateway;

#[async_trait]
impl ToolboxGateway for DefaultToolboxGateway {
    async fn run_health_check(&self, check: &HealthCheck) -> HealthCheckResult {
        ToolboxService::run_health_check(check).await
    }

    async fn wait_for_propagation(
        &self,
        query: &PropagationQuery,
        options: &PropagationOptions,
    ) -> CoreResult<PropagationOutcome> {
        Ok(ToolboxService::wait_for_propagation(query, options).await?)
    }
}
