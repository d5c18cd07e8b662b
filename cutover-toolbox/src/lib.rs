//! Network checks for DNS cutovers
//!
//! HTTP/TCP health checks and DNS propagation checks against public resolvers.
//! All functions are stateless and independent of cutover business logic.

mod error;
mod services;
mod types;

pub use error::{ToolboxError, ToolboxResult};
pub use services::{HickoryRecordLookup, RecordLookup, ToolboxService};
pub use types::{
    default_nameservers, DnsQueryType, HealthCheck, HealthCheckResult, HealthCheckType,
    NameserverResult, PropagationOptions, PropagationOutcome, PropagationQuery,
    PropagationServer, PropagationStatus, Quorum,
};
