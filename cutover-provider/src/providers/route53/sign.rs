//! AWS Signature Version 4

use std::fmt::Write;

use crate::providers::common::{hmac_sha256, sha256_hex};
use crate::utils::log_sanitizer::truncate_for_log;

use super::{R53_SERVICE, Route53Provider};

/// Headers to attach to a signed request.
#[derive(Debug, Clone)]
pub(crate) struct SignedRequest {
    pub authorization: String,
    pub amz_date: String,
    pub security_token: Option<String>,
}

/// `kSigning = HMAC(HMAC(HMAC(HMAC("AWS4" + secret, date), region), service), "aws4_request")`
pub(crate) fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// Query string in canonical form: keys sorted, keys and values URI-encoded.
pub(crate) fn canonical_query(query: &[(&str, &str)]) -> String {
    let mut pairs: Vec<(String, String)> = query
        .iter()
        .map(|(k, v)| {
            (
                urlencoding::encode(k).into_owned(),
                urlencoding::encode(v).into_owned(),
            )
        })
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

impl Route53Provider {
    /// Sign a request.
    /// Reference: <https://docs.aws.amazon.com/IAM/latest/UserGuide/create-signed-request.html>
    ///
    /// `amz_date` is `YYYYMMDD'T'HHMMSS'Z'` in UTC.
    pub(crate) fn sign(
        &self,
        method: &str,
        path: &str,
        query: &[(&str, &str)],
        payload: &str,
        amz_date: &str,
    ) -> SignedRequest {
        let date = &amz_date[..amz_date.len().min(8)];

        let mut headers: Vec<(&str, &str)> = vec![("host", self.signing_host()), ("x-amz-date", amz_date)];
        if let Some(token) = &self.session_token {
            headers.push(("x-amz-security-token", token.as_str()));
        }
        headers.sort_by(|a, b| a.0.cmp(b.0));

        let canonical_headers = headers.iter().fold(String::new(), |mut acc, (k, v)| {
            let _ = writeln!(acc, "{k}:{}", v.trim());
            acc
        });
        let signed_headers = headers
            .iter()
            .map(|(k, _)| *k)
            .collect::<Vec<_>>()
            .join(";");

        let canonical_request = format!(
            "{method}\n{path}\n{}\n{canonical_headers}\n{signed_headers}\n{}",
            canonical_query(query),
            sha256_hex(payload.as_bytes())
        );
        log::debug!("CanonicalRequest:\n{}", truncate_for_log(&canonical_request));

        let scope = format!("{date}/{}/{R53_SERVICE}/aws4_request", self.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
            sha256_hex(canonical_request.as_bytes())
        );
        log::debug!("StringToSign:\n{string_to_sign}");

        let key = signing_key(&self.secret_access_key, date, &self.region, R53_SERVICE);
        let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

        SignedRequest {
            authorization: format!(
                "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
                self.access_key_id
            ),
            amz_date: amz_date.to_string(),
            security_token: self.session_token.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATE: &str = "20240101T000000Z";

    fn provider(secret: &str, token: Option<&str>) -> Route53Provider {
        Route53Provider::new(
            "AKIDEXAMPLE".to_string(),
            secret.to_string(),
            token.map(str::to_string),
            None,
            None,
        )
    }

    #[test]
    fn test_signing_key_matches_aws_example() {
        // Example from the AWS "derive a signing key" documentation
        let key = signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn test_canonical_query_sorted_and_encoded() {
        assert_eq!(
            canonical_query(&[("type", "A"), ("name", "www.example.com."), ("maxitems", "1")]),
            "maxitems=1&name=www.example.com.&type=A"
        );
        assert_eq!(canonical_query(&[("q", "a b/c")]), "q=a%20b%2Fc");
        assert_eq!(canonical_query(&[]), "");
    }

    #[test]
    fn test_authorization_format() {
        let signed = provider("secret", None).sign("GET", "/2013-04-01/hostedzonecount", &[], "", DATE);
        assert!(signed.authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240101/us-east-1/route53/aws4_request, "
        ));
        assert!(signed.authorization.contains("SignedHeaders=host;x-amz-date, "));
        assert_eq!(signed.amz_date, DATE);
        assert!(signed.security_token.is_none());
    }

    #[test]
    fn test_session_token_is_signed() {
        let signed = provider("secret", Some("token")).sign("GET", "/", &[], "", DATE);
        assert!(
            signed
                .authorization
                .contains("SignedHeaders=host;x-amz-date;x-amz-security-token, ")
        );
        assert_eq!(signed.security_token.as_deref(), Some("token"));
    }

    #[test]
    fn test_signature_is_deterministic_and_input_sensitive() {
        let p = provider("secret", None);
        let a = p.sign("POST", "/2013-04-01/hostedzone/Z1/rrset", &[], "<x/>", DATE);
        let b = p.sign("POST", "/2013-04-01/hostedzone/Z1/rrset", &[], "<x/>", DATE);
        let c = p.sign("POST", "/2013-04-01/hostedzone/Z1/rrset", &[], "<y/>", DATE);
        let d = provider("other", None).sign("POST", "/2013-04-01/hostedzone/Z1/rrset", &[], "<x/>", DATE);
        assert_eq!(a.authorization, b.authorization);
        assert_ne!(a.authorization, c.authorization);
        assert_ne!(a.authorization, d.authorization);
    }

    #[test]
    fn test_custom_endpoint_host_is_signed() {
        let default = provider("secret", None);
        assert_eq!(default.signing_host(), "route53.amazonaws.com");

        let local = provider("secret", None).with_endpoint("http://127.0.0.1:8053/");
        assert_eq!(local.endpoint, "http://127.0.0.1:8053");
        assert_eq!(local.signing_host(), "127.0.0.1:8053");
        assert_ne!(
            default.sign("GET", "/", &[], "", DATE).authorization,
            local.sign("GET", "/", &[], "", DATE).authorization
        );
    }
}
