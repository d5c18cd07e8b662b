//! Route 53 error mapping

use crate::error::ProviderError;
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};

use super::Route53Provider;

/// Route 53 error code mapping
/// Reference: <https://docs.aws.amazon.com/Route53/latest/APIReference/CommonErrors.html>
impl ProviderErrorMapper for Route53Provider {
    fn provider_name(&self) -> &'static str {
        "route53"
    }

    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ProviderError {
        let provider = self.provider_name().to_string();
        match raw.code.as_deref() {
            Some(
                "InvalidClientTokenId"
                | "SignatureDoesNotMatch"
                | "IncompleteSignature"
                | "MissingAuthenticationToken"
                | "ExpiredToken"
                | "InvalidSignatureException",
            ) => ProviderError::InvalidCredentials {
                provider,
                raw_message: Some(raw.message),
            },

            Some("AccessDenied" | "AccessDeniedException" | "NotAuthorized") => {
                ProviderError::PermissionDenied {
                    provider,
                    raw_message: Some(raw.message),
                }
            }

            Some("Throttling" | "ThrottlingException" | "PriorRequestNotComplete") => {
                ProviderError::RateLimited {
                    provider,
                    retry_after: None,
                    raw_message: Some(raw.message),
                }
            }

            Some("NoSuchHostedZone" | "HostedZoneNotFound") => ProviderError::DomainNotFound {
                provider,
                domain: context.domain.unwrap_or_else(|| "<unknown>".to_string()),
                raw_message: Some(raw.message),
            },

            // The batch error carries the reason only in its message
            Some("InvalidChangeBatch") => {
                let message = raw.message.to_lowercase();
                if message.contains("already exists") {
                    ProviderError::RecordExists {
                        provider,
                        record_name: context
                            .record_name
                            .unwrap_or_else(|| "<unknown>".to_string()),
                        raw_message: Some(raw.message),
                    }
                } else if message.contains("not found") {
                    ProviderError::RecordNotFound {
                        provider,
                        record_id: context
                            .record_id
                            .or(context.record_name)
                            .unwrap_or_else(|| "<unknown>".to_string()),
                        raw_message: Some(raw.message),
                    }
                } else {
                    ProviderError::InvalidParameter {
                        provider,
                        param: "change_batch".to_string(),
                        detail: raw.message,
                    }
                }
            }

            Some("InvalidInput" | "InvalidArgument") => ProviderError::InvalidParameter {
                provider,
                param: "input".to_string(),
                detail: raw.message,
            },

            Some("LimitsExceeded" | "TooManyRecords") => ProviderError::QuotaExceeded {
                provider,
                raw_message: Some(raw.message),
            },

            _ => self.unknown_error(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> Route53Provider {
        Route53Provider::new(String::new(), String::new(), None, None, None)
    }

    fn ctx() -> ErrorContext {
        ErrorContext {
            record_name: Some("www.example.com".to_string()),
            record_id: None,
            domain: Some("example.com".to_string()),
        }
    }

    #[test]
    fn test_auth_and_permission() {
        let p = provider();
        let err = p.map_error(RawApiError::with_code("SignatureDoesNotMatch", "bad sig"), ctx());
        assert!(matches!(err, ProviderError::InvalidCredentials { .. }));
        let err = p.map_error(RawApiError::with_code("AccessDenied", "denied"), ctx());
        assert!(matches!(err, ProviderError::PermissionDenied { .. }));
    }

    #[test]
    fn test_throttling_is_transient() {
        let err = provider().map_error(RawApiError::with_code("Throttling", "Rate exceeded"), ctx());
        assert!(err.is_transient());
    }

    #[test]
    fn test_no_such_hosted_zone() {
        let err = provider().map_error(RawApiError::with_code("NoSuchHostedZone", "none"), ctx());
        assert!(matches!(
            err,
            ProviderError::DomainNotFound { ref domain, .. } if domain == "example.com"
        ));
    }

    #[test]
    fn test_invalid_change_batch_variants() {
        let p = provider();
        let exists = p.map_error(
            RawApiError::with_code("InvalidChangeBatch", "Tried to create ... but it already exists"),
            ctx(),
        );
        assert!(matches!(exists, ProviderError::RecordExists { .. }));

        let missing = p.map_error(
            RawApiError::with_code("InvalidChangeBatch", "Tried to delete ... but it was not found"),
            ctx(),
        );
        assert!(matches!(
            missing,
            ProviderError::RecordNotFound { ref record_id, .. } if record_id == "www.example.com"
        ));

        let other = p.map_error(
            RawApiError::with_code("InvalidChangeBatch", "CNAME is not permitted at apex"),
            ctx(),
        );
        assert!(matches!(other, ProviderError::InvalidParameter { .. }));
    }

    #[test]
    fn test_unknown_falls_back() {
        let err = provider().map_error(RawApiError::with_code("HTTP500", "boom"), ctx());
        assert!(matches!(err, ProviderError::Unknown { .. }));
    }
}
