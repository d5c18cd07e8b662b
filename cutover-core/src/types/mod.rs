//! 类型定义模块
//!
//! Plan, step, trigger and result models of a cutover run.

mod options;
mod plan;
mod result;
mod step;
mod trigger;

pub use options::{
    ExecuteOptions, OrchestratorSettings, ProgressHook, RollbackOptions, StepHook,
    MANUAL_PROVIDER,
};
pub use plan::{CutoverPlan, PlanStatus};
pub use result::{ExecutionLog, ExecutionResult, LogLevel};
pub use step::{CutoverStep, StepStatus, StepType};
pub use trigger::RollbackTrigger;

// Re-export the record and check models used inside plans
pub use cutover_provider::{
    DnsChange, DnsChangeStatus, DnsRecord, DnsRecordType, ProviderCredentials, ProviderMetadata,
    ProviderType,
};
pub use cutover_toolbox::{
    DnsQueryType, HealthCheck, HealthCheckResult, HealthCheckType, PropagationOptions,
    PropagationOutcome, PropagationQuery, PropagationServer, Quorum,
};
