//! # cutover-provider
//!
//! DNS provider abstraction used by the cutover orchestrator: the record
//! change model, a provider trait whose mutations record their own outcome on
//! the change, and the concrete providers.
//!
//! ## Supported Providers
//!
//! | Provider | Feature Flag | Auth Method |
//! |----------|-------------|-------------|
//! | Manual (operator instructions) | *always* | none |
//! | [Cloudflare](https://www.cloudflare.com/) | `cloudflare` | Bearer Token |
//! | [AWS Route 53](https://aws.amazon.com/route53/) | `route53` | AWS Signature V4 |
//!
//! ## Feature Flags
//!
//! - **`all-providers`** *(default)*: every provider above.
//! - **`cloudflare`**, **`route53`**: a single provider.
//! - **`native-tls`** *(default)* / **`rustls`**: TLS backend for reqwest.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cutover_provider::{create_provider, DnsChange, DnsProvider, DnsRecordType, ProviderCredentials};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = create_provider(ProviderCredentials::Cloudflare {
//!         api_token: "your-token".to_string(),
//!         zone_id: None,
//!     })?;
//!
//!     let mut change = DnsChange::new("web", "example.com", DnsRecordType::A, "www", "203.0.113.10")
//!         .with_old_value("198.51.100.7")
//!         .with_ttl(60);
//!     provider.update_record(&mut change).await?;
//!     println!("{} is {}", change.describe(), change.status);
//!
//!     // Put it back
//!     let mut revert = change.reverted();
//!     provider.update_record(&mut revert).await?;
//!     change.mark_rolled_back();
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All provider operations return [`Result<T, ProviderError>`](ProviderError).
//! Read requests are retried on transient errors (`NetworkError`, `Timeout`,
//! `RateLimited`) with exponential backoff; record mutations are sent once.

mod error;
mod factory;
#[cfg(any(feature = "cloudflare", feature = "route53"))]
mod http_client;
mod providers;
mod traits;
mod types;
mod utils;

pub use error::{ProviderError, Result};

pub use factory::{create_provider, get_all_provider_metadata};

// Internal traits (error mapping) are not exported
pub use traits::DnsProvider;

pub use types::{
    CredentialValidationError, DnsChange, DnsChangeStatus, DnsRecord, DnsRecordType, FieldType,
    ProviderCredentialField, ProviderCredentials, ProviderMetadata, ProviderType,
};

pub use utils::log_sanitizer;

pub use providers::{ManualProvider, describe_change};

#[cfg(feature = "cloudflare")]
pub use providers::CloudflareProvider;

#[cfg(feature = "route53")]
pub use providers::Route53Provider;
