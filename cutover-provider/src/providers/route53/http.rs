//! Route 53 request plumbing

use chrono::Utc;
use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::http_client::{HttpUtils, RequestKind};
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};

use super::sign::canonical_query;
use super::types::{ErrorResponse, InvalidChangeBatchResponse};
use super::Route53Provider;

impl Route53Provider {
    /// Send a signed request and decode the XML response.
    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<String>,
        kind: RequestKind,
        context: ErrorContext,
    ) -> Result<T> {
        let payload = body.unwrap_or_default();
        let amz_date = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        let signed = self.sign(method.as_str(), path, query, &payload, &amz_date);

        let query_string = canonical_query(query);
        let url = if query_string.is_empty() {
            format!("{}{path}", self.endpoint)
        } else {
            format!("{}{path}?{query_string}", self.endpoint)
        };

        let mut builder = self
            .client
            .request(method.clone(), &url)
            .header("x-amz-date", &signed.amz_date)
            .header("authorization", &signed.authorization);
        if let Some(token) = &signed.security_token {
            builder = builder.header("x-amz-security-token", token);
        }
        if !payload.is_empty() {
            builder = builder
                .header("content-type", "text/xml")
                .body(payload);
        }

        let (status, text) =
            HttpUtils::send(builder, self.provider_name(), method.as_str(), &url, kind).await?;

        if status >= 400 {
            let error = self.map_error(Self::raw_error(status, &text), context);
            if error.is_expected() {
                log::warn!("[{}] HTTP {status}: {error}", self.provider_name());
            } else {
                log::error!("[{}] HTTP {status}: {error}", self.provider_name());
            }
            return Err(error);
        }

        HttpUtils::parse_xml(&text, self.provider_name())
    }

    /// Pull the error code and message out of an error body.
    pub(crate) fn raw_error(status: u16, body: &str) -> RawApiError {
        if let Ok(resp) = quick_xml::de::from_str::<ErrorResponse>(body) {
            return RawApiError::with_code(resp.error.code, resp.error.message);
        }
        if let Ok(resp) = quick_xml::de::from_str::<InvalidChangeBatchResponse>(body)
            && !resp.messages.items.is_empty()
        {
            return RawApiError::with_code("InvalidChangeBatch", resp.messages.items.join("; "));
        }
        RawApiError::with_code(
            format!("HTTP{status}"),
            crate::utils::log_sanitizer::truncate_for_log(body),
        )
    }
}
