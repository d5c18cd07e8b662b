//! DNS Provider implementations

/// Shared utilities used by provider implementations.
#[cfg(any(feature = "cloudflare", feature = "route53"))]
pub mod common;

mod manual;

#[cfg(feature = "cloudflare")]
mod cloudflare;
#[cfg(feature = "route53")]
mod route53;

#[cfg(feature = "cloudflare")]
pub use cloudflare::CloudflareProvider;
pub use manual::{ManualProvider, describe_change};
#[cfg(feature = "route53")]
pub use route53::Route53Provider;
