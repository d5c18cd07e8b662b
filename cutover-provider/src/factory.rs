//! Provider factory functions and metadata.

use std::sync::Arc;

use crate::error::Result;
use crate::providers::ManualProvider;
use crate::traits::DnsProvider;
use crate::types::{ProviderCredentials, ProviderMetadata};

#[cfg(feature = "cloudflare")]
use crate::providers::CloudflareProvider;
#[cfg(feature = "route53")]
use crate::providers::Route53Provider;

/// Creates a [`DnsProvider`] instance from the given credentials.
///
/// The concrete provider type is determined by the [`ProviderCredentials`] variant.
/// Credentials are moved into the provider and not kept anywhere else.
///
/// # Examples
///
/// ```rust,no_run
/// use cutover_provider::{create_provider, DnsProvider, ProviderCredentials};
///
/// let provider = create_provider(ProviderCredentials::Cloudflare {
///     api_token: "your-token".to_string(),
///     zone_id: None,
/// }).unwrap();
/// assert_eq!(provider.id(), "cloudflare");
/// ```
pub fn create_provider(credentials: ProviderCredentials) -> Result<Arc<dyn DnsProvider>> {
    log::debug!("Creating DNS provider: {credentials:?}");
    match credentials {
        ProviderCredentials::Manual => Ok(Arc::new(ManualProvider::new())),
        #[cfg(feature = "cloudflare")]
        ProviderCredentials::Cloudflare { api_token, zone_id } => {
            Ok(Arc::new(CloudflareProvider::new(api_token, zone_id)))
        }
        #[cfg(feature = "route53")]
        ProviderCredentials::Route53 {
            access_key_id,
            secret_access_key,
            session_token,
            region,
            hosted_zone_id,
        } => Ok(Arc::new(Route53Provider::new(
            access_key_id,
            secret_access_key,
            session_token,
            region,
            hosted_zone_id,
        ))),
    }
}

/// Returns metadata for every provider compiled into this build.
pub fn get_all_provider_metadata() -> Vec<ProviderMetadata> {
    vec![
        ManualProvider::metadata(),
        #[cfg(feature = "cloudflare")]
        CloudflareProvider::metadata(),
        #[cfg(feature = "route53")]
        Route53Provider::metadata(),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::ProviderType;

    #[test]
    fn test_manual_provider_from_credentials() {
        let provider = create_provider(ProviderCredentials::Manual).unwrap();
        assert_eq!(provider.id(), "manual");
        assert!(!provider.applies_changes());
    }

    #[cfg(feature = "route53")]
    #[test]
    fn test_route53_provider_from_credentials() {
        let provider = create_provider(ProviderCredentials::Route53 {
            access_key_id: "AKID".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: None,
            region: None,
            hosted_zone_id: Some("Z1".to_string()),
        })
        .unwrap();
        assert_eq!(provider.id(), "route53");
        assert!(provider.applies_changes());
    }

    #[test]
    fn test_metadata_lists_manual_first() {
        let all = get_all_provider_metadata();
        assert_eq!(all[0].id, ProviderType::Manual);
        #[cfg(feature = "all-providers")]
        assert_eq!(all.len(), 3);
    }
}
