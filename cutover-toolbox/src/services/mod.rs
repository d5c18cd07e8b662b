//! Stateless service façade exposing all toolbox operations.
//!
//! Every method on [`ToolboxService`] is an async associated function — no instance needed.

mod health;
mod lookup;
mod propagation;
mod resolver;

pub use lookup::{HickoryRecordLookup, RecordLookup};

pub(crate) use health::normalize_url;

use crate::error::{ToolboxError, ToolboxResult};
use crate::types::{
    HealthCheck, HealthCheckResult, PropagationOptions, PropagationOutcome, PropagationQuery,
};

/// Trim and sanity-check a query before it goes to the network.
fn validate_query(query: &PropagationQuery) -> ToolboxResult<PropagationQuery> {
    let domain = query.domain.trim().trim_end_matches('.');
    if domain.is_empty() {
        return Err(ToolboxError::ValidationError(
            "Domain name is required".to_string(),
        ));
    }
    if domain.len() > 253 {
        return Err(ToolboxError::ValidationError(format!(
            "Domain name exceeds maximum length of 253 characters (got {})",
            domain.len()
        )));
    }
    if query.expected_value.trim().is_empty() {
        return Err(ToolboxError::ValidationError(format!(
            "Expected value is required for {} {domain}",
            query.record_type
        )));
    }
    Ok(PropagationQuery {
        domain: domain.to_string(),
        record_type: query.record_type,
        expected_value: query.expected_value.trim().to_string(),
    })
}

/// Entry point for the network checks used during a cutover.
///
/// ```rust,no_run
/// use cutover_toolbox::{DnsQueryType, PropagationOptions, PropagationQuery, ToolboxService};
/// # async fn demo() -> cutover_toolbox::ToolboxResult<()> {
/// let query = PropagationQuery::new("www.example.com", DnsQueryType::A, "203.0.113.10");
/// let outcome = ToolboxService::wait_for_propagation(&query, &PropagationOptions::default()).await?;
/// println!("propagated: {}", outcome.propagated);
/// # Ok(())
/// # }
/// ```
pub struct ToolboxService;

impl ToolboxService {
    /// Run an HTTP or TCP health check, honouring its retry settings.
    ///
    /// A failing check is a failed [`HealthCheckResult`], not an error.
    pub async fn run_health_check(check: &HealthCheck) -> HealthCheckResult {
        health::run_health_check(check).await
    }

    /// Wait until the configured nameservers return the expected value.
    ///
    /// Uses hickory for the lookups. Per-nameserver failures are recorded in
    /// the outcome; only an invalid query is an error.
    pub async fn wait_for_propagation(
        query: &PropagationQuery,
        options: &PropagationOptions,
    ) -> ToolboxResult<PropagationOutcome> {
        Self::wait_for_propagation_with(&HickoryRecordLookup::default(), query, options).await
    }

    /// [`wait_for_propagation`](Self::wait_for_propagation) with a custom lookup backend.
    pub async fn wait_for_propagation_with(
        lookup: &dyn RecordLookup,
        query: &PropagationQuery,
        options: &PropagationOptions,
    ) -> ToolboxResult<PropagationOutcome> {
        let query = validate_query(query)?;
        Ok(propagation::wait_for_propagation(lookup, &query, options).await)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::DnsQueryType;

    #[test]
    fn test_validate_query_normalizes() {
        let q = PropagationQuery::new(" www.example.com. ", DnsQueryType::A, " 203.0.113.10 ");
        let q = validate_query(&q).unwrap();
        assert_eq!(q.domain, "www.example.com");
        assert_eq!(q.expected_value, "203.0.113.10");
    }

    #[test]
    fn test_validate_query_rejects_empty() {
        let q = PropagationQuery::new("", DnsQueryType::A, "203.0.113.10");
        assert!(matches!(
            validate_query(&q),
            Err(ToolboxError::ValidationError(_))
        ));

        let q = PropagationQuery::new("www.example.com", DnsQueryType::A, "  ");
        assert!(matches!(
            validate_query(&q),
            Err(ToolboxError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_query_rejects_long_domain() {
        let q = PropagationQuery::new("a".repeat(254), DnsQueryType::Txt, "x");
        assert!(validate_query(&q).is_err());
    }

    #[tokio::test]
    async fn test_invalid_query_is_an_error() {
        let q = PropagationQuery::new("", DnsQueryType::A, "203.0.113.10");
        let result = ToolboxService::wait_for_propagation(&q, &PropagationOptions::default()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_wait_for_propagation_real() {
        let q = PropagationQuery::new("one.one.one.one", DnsQueryType::A, "1.1.1.1");
        let outcome = ToolboxService::wait_for_propagation(&q, &PropagationOptions::default())
            .await
            .unwrap();
        assert!(outcome.propagated);
    }
}
