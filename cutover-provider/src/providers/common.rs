//! Helpers shared by the API-backed providers.

use std::time::Duration;

use reqwest::Client;

use crate::error::{ProviderError, Result};
use crate::types::DnsRecordType;

// ============ HTTP Client ============

/// Connect timeout (seconds)
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Whole-request timeout (seconds)
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// HTTP client with connect/request timeouts.
///
/// Falls back to reqwest defaults if the TLS backend cannot be initialised
/// with the configured timeouts.
pub fn create_http_client() -> Client {
    Client::builder()
        .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
        .user_agent(concat!("dns-cutover/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            log::warn!("Failed to build configured HTTP client, using defaults: {e}");
            Client::new()
        })
}

// ============ Record types ============

/// Parse a provider-reported record type.
pub fn parse_record_type(record_type: &str, provider: &str) -> Result<DnsRecordType> {
    record_type
        .parse()
        .map_err(|_| ProviderError::UnsupportedRecordType {
            provider: provider.to_string(),
            record_type: record_type.to_string(),
        })
}

// ============ HMAC-SHA256 ============

/// HMAC-SHA256 digest, used by AWS Signature V4.
#[cfg(feature = "route53")]
#[allow(clippy::expect_used)]
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Lowercase hex SHA-256 of `data`.
#[cfg(feature = "route53")]
pub fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};

    hex::encode(Sha256::digest(data))
}

// ============ Names ============

/// Strip the trailing dot of an absolute name.
pub fn normalize_domain_name(name: &str) -> String {
    name.trim_end_matches('.').to_string()
}

/// `"www.example.com"` in zone `"example.com"` → `"www"`; the apex → `"@"`.
pub fn full_name_to_relative(full_name: &str, zone_name: &str) -> String {
    let full = normalize_domain_name(full_name);
    let zone = normalize_domain_name(zone_name);

    if full.eq_ignore_ascii_case(&zone) {
        "@".to_string()
    } else if let Some(subdomain) = full.strip_suffix(&format!(".{zone}")) {
        subdomain.to_string()
    } else {
        full
    }
}

/// Compare two record values the way DNS does: case-insensitive, ignoring
/// a trailing dot and surrounding TXT quotes.
pub fn values_match(a: &str, b: &str) -> bool {
    fn clean(v: &str) -> &str {
        v.trim().trim_matches('"').trim_end_matches('.')
    }
    clean(a).eq_ignore_ascii_case(clean(b))
}
