//! Cloudflare error mapping

use crate::error::ProviderError;
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};

use super::CloudflareProvider;

/// Cloudflare error code mapping
/// Reference: <https://developers.cloudflare.com/fundamentals/api/reference/errors/>
impl ProviderErrorMapper for CloudflareProvider {
    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }

    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ProviderError {
        let provider = self.provider_name().to_string();
        match raw.code.as_deref() {
            // 6003: Invalid request headers
            // 6111: Invalid format for Authorization header
            // 10000: Authentication error
            Some("6003" | "6111" | "10000") => ProviderError::InvalidCredentials {
                provider,
                raw_message: Some(raw.message),
            },

            // 9109: Unauthorized to access requested resource
            // 10001: Token lacks the required permission
            Some("9109" | "10001") => ProviderError::PermissionDenied {
                provider,
                raw_message: Some(raw.message),
            },

            // 971: Please wait and consider throttling your request speed
            // 10013: Rate limited
            Some("971" | "10013") => ProviderError::RateLimited {
                provider,
                retry_after: None,
                raw_message: Some(raw.message),
            },

            // 1004: DNS Validation Error
            // 9000: Invalid or missing name
            // 9005 / 9006: A / AAAA content is not a valid address
            // 9007: Content for CNAME record is invalid
            // 9009: Content for MX record must be a hostname
            // 9021: Invalid TTL
            // 9101 / 9102: SRV data invalid
            Some(
                code @ ("1004" | "9000" | "9005" | "9006" | "9007" | "9009" | "9021" | "9101"
                | "9102"),
            ) => {
                let param = match code {
                    "9000" => "name",
                    "9005" | "9006" | "9007" | "9009" => "value",
                    "9021" => "ttl",
                    "9101" | "9102" => "data",
                    _ => "general",
                };
                ProviderError::InvalidParameter {
                    provider,
                    param: param.to_string(),
                    detail: raw.message,
                }
            }

            // 81053: An A, AAAA or CNAME record already exists with that host
            // 81054: A CNAME record with that host already exists
            // 81057: The record already exists
            // 81058: A record with those settings already exists
            Some("81053" | "81054" | "81057" | "81058") => ProviderError::RecordExists {
                provider,
                record_name: context
                    .record_name
                    .unwrap_or_else(|| "<unknown>".to_string()),
                raw_message: Some(raw.message),
            },

            // 81044: Record does not exist
            Some("81044") => ProviderError::RecordNotFound {
                provider,
                record_id: context.record_id.unwrap_or_else(|| "<unknown>".to_string()),
                raw_message: Some(raw.message),
            },

            // 81045: The record quota has been exceeded
            Some("81045") => ProviderError::QuotaExceeded {
                provider,
                raw_message: Some(raw.message),
            },

            // 1001: Invalid zone identifier
            // 7003: Could not route to /path, object identifier invalid
            Some("1001" | "7003") => ProviderError::DomainNotFound {
                provider,
                domain: context.domain.unwrap_or_else(|| "<unknown>".to_string()),
                raw_message: Some(raw.message),
            },

            _ => self.unknown_error(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> CloudflareProvider {
        CloudflareProvider::new(String::new(), None)
    }

    fn ctx() -> ErrorContext {
        ErrorContext {
            record_name: Some("www.example.com".to_string()),
            record_id: Some("rec-123".to_string()),
            domain: Some("example.com".to_string()),
        }
    }

    #[test]
    fn test_auth_codes() {
        let p = provider();
        for code in ["6003", "6111", "10000"] {
            let err = p.map_error(RawApiError::with_code(code, "auth"), ctx());
            assert!(matches!(err, ProviderError::InvalidCredentials { .. }), "{code}");
        }
        let err = p.map_error(RawApiError::with_code("9109", "no access"), ctx());
        assert!(matches!(err, ProviderError::PermissionDenied { .. }));
    }

    #[test]
    fn test_invalid_parameter_names_field() {
        let p = provider();
        let err = p.map_error(RawApiError::with_code("9021", "bad ttl"), ctx());
        assert!(matches!(
            err,
            ProviderError::InvalidParameter { ref param, .. } if param == "ttl"
        ));
        let err = p.map_error(RawApiError::with_code("9005", "bad ip"), ctx());
        assert!(matches!(
            err,
            ProviderError::InvalidParameter { ref param, .. } if param == "value"
        ));
    }

    #[test]
    fn test_record_exists_uses_context_name() {
        let err = provider().map_error(RawApiError::with_code("81057", "exists"), ctx());
        assert!(matches!(
            err,
            ProviderError::RecordExists { ref record_name, .. } if record_name == "www.example.com"
        ));
    }

    #[test]
    fn test_record_not_found_default_context() {
        let err = provider().map_error(
            RawApiError::with_code("81044", "missing"),
            ErrorContext::default(),
        );
        assert!(matches!(
            err,
            ProviderError::RecordNotFound { ref record_id, .. } if record_id == "<unknown>"
        ));
    }

    #[test]
    fn test_zone_not_found() {
        let err = provider().map_error(RawApiError::with_code("7003", "no route"), ctx());
        assert!(matches!(
            err,
            ProviderError::DomainNotFound { ref domain, .. } if domain == "example.com"
        ));
    }

    #[test]
    fn test_rate_limit_is_transient() {
        let err = provider().map_error(RawApiError::with_code("971", "slow down"), ctx());
        assert!(err.is_transient());
    }

    #[test]
    fn test_unknown_code_falls_back() {
        let err = provider().map_error(RawApiError::with_code("99999", "odd"), ctx());
        assert!(matches!(
            err,
            ProviderError::Unknown { ref raw_code, .. } if raw_code.as_deref() == Some("99999")
        ));
        let err = provider().map_error(RawApiError::new("no code"), ctx());
        assert!(matches!(err, ProviderError::Unknown { raw_code: None, .. }));
    }
}
