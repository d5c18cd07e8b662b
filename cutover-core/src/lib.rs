//! Cutover Core Library
//!
//! Switches live traffic to a newly deployed stack by changing DNS records:
//! - Cutover plans (pre-checks, DNS changes, post-checks, rollback triggers)
//! - The orchestrator state machine with automatic rollback
//! - Provider registry and the toolbox gateway to network checks
//!
//! The orchestrator keeps no state of its own: callers hold the plan and may
//! persist it between `execute` and a later `rollback`.

pub mod cancel;
pub mod error;
pub mod services;
pub mod traits;
pub mod types;
pub mod utils;

#[cfg(test)]
mod test_utils;

// Re-export common types
pub use cancel::CancelToken;
pub use error::{CoreError, CoreResult};
pub use services::CutoverOrchestrator;
pub use traits::{
    DefaultToolboxGateway, InMemoryProviderRegistry, ProviderRegistry, ToolboxGateway,
};
pub use types::{
    CutoverPlan, CutoverStep, ExecuteOptions, ExecutionLog, ExecutionResult, LogLevel,
    OrchestratorSettings, PlanStatus, RollbackOptions, RollbackTrigger, StepStatus, StepType,
};
