//! Seams the orchestrator depends on

mod provider_registry;
mod toolbox_gateway;

pub use provider_registry::{InMemoryProviderRegistry, ProviderRegistry};
pub use toolbox_gateway::{DefaultToolboxGateway, ToolboxGateway};
