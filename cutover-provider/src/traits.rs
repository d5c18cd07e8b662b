use async_trait::async_trait;

use crate::error::{ProviderError, Result};
use crate::types::{DnsChange, DnsRecord, ProviderMetadata};

/// Raw API error (internal).
#[cfg_attr(
    not(any(feature = "cloudflare", feature = "route53")),
    allow(dead_code)
)]
#[derive(Debug, Clone)]
pub(crate) struct RawApiError {
    /// Error code, format differs per provider
    pub code: Option<String>,
    /// Original error message
    pub message: String,
}

#[cfg_attr(
    not(any(feature = "cloudflare", feature = "route53")),
    allow(dead_code)
)]
impl RawApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

/// Extra information attached while mapping an API error (internal).
#[cfg_attr(
    not(any(feature = "cloudflare", feature = "route53")),
    allow(dead_code)
)]
#[derive(Debug, Clone, Default)]
pub(crate) struct ErrorContext {
    /// Record name, for `RecordExists`
    pub record_name: Option<String>,
    /// Record id, for `RecordNotFound`
    pub record_id: Option<String>,
    /// Domain, for `DomainNotFound`
    pub domain: Option<String>,
}

impl ErrorContext {
    /// Context describing a change about to be sent to the provider.
    #[cfg_attr(
        not(any(feature = "cloudflare", feature = "route53")),
        allow(dead_code)
    )]
    pub fn for_change(change: &DnsChange) -> Self {
        Self {
            record_name: Some(change.fqdn()),
            record_id: if change.provider_record_id.is_empty() {
                None
            } else {
                Some(change.provider_record_id.clone())
            },
            domain: Some(change.domain.clone()),
        }
    }
}

/// Maps raw provider API errors onto [`ProviderError`] (internal).
#[cfg_attr(
    not(any(feature = "cloudflare", feature = "route53")),
    allow(dead_code)
)]
pub(crate) trait ProviderErrorMapper {
    /// Provider identifier
    fn provider_name(&self) -> &'static str;

    /// Map a raw API error to the unified error type
    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ProviderError;

    /// Shortcut: parse error
    fn parse_error(&self, detail: impl ToString) -> ProviderError {
        ProviderError::ParseError {
            provider: self.provider_name().to_string(),
            detail: detail.to_string(),
        }
    }

    /// Shortcut: unknown error (fallback)
    fn unknown_error(&self, raw: RawApiError) -> ProviderError {
        ProviderError::Unknown {
            provider: self.provider_name().to_string(),
            raw_code: raw.code,
            raw_message: raw.message,
        }
    }
}

/// A DNS provider capable of applying and reverting cutover changes.
///
/// Mutations take the [`DnsChange`] by mutable reference: on success the
/// provider fills `provider_record_id` and marks the change applied; on
/// failure the change is left untouched and the error is returned as-is.
/// Mutations are never retried.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Provider identifier
    fn id(&self) -> &'static str;

    /// Type-level provider metadata (name, description, credential fields).
    ///
    /// Callable before a provider instance exists.
    fn metadata() -> ProviderMetadata
    where
        Self: Sized;

    /// Whether mutations actually change live DNS.
    ///
    /// Providers returning `false` only describe the change; the orchestrator
    /// then runs in manual mode.
    fn applies_changes(&self) -> bool {
        true
    }

    /// Check the credentials against the remote API.
    async fn validate_credentials(&self) -> Result<bool>;

    /// All records of a zone.
    async fn list_records(&self, domain: &str) -> Result<Vec<DnsRecord>>;

    /// A single record by provider record id.
    async fn get_record(&self, domain: &str, record_id: &str) -> Result<DnsRecord>;

    /// Create the record described by `change.new_value`.
    async fn create_record(&self, change: &mut DnsChange) -> Result<()>;

    /// Replace the record value with `change.new_value`.
    ///
    /// When `provider_record_id` is empty the record is located by name, type
    /// and `old_value`.
    async fn update_record(&self, change: &mut DnsChange) -> Result<()>;

    /// Delete a record by provider record id.
    async fn delete_record(&self, domain: &str, record_id: &str) -> Result<()>;
}
