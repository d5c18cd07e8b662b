//! Cloudflare request plumbing

use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::http_client::{HttpUtils, RequestKind};
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};
use crate::utils::log_sanitizer::truncate_for_log;

use super::{CloudflareProvider, CloudflareResponse, RecordBody};

impl CloudflareProvider {
    /// Send a request and return the whole (successful) envelope.
    pub(crate) async fn request_envelope<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&RecordBody>,
        kind: RequestKind,
        context: ErrorContext,
    ) -> Result<CloudflareResponse<T>> {
        let url = format!("{}{path}", self.api_base);
        let mut builder = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(&self.api_token);

        if let Some(body) = body {
            let json = HttpUtils::to_json(body, self.provider_name())?;
            log::debug!("[{}] Request Body: {}", self.provider_name(), truncate_for_log(&json));
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(json);
        }

        let (status, text) =
            HttpUtils::send(builder, self.provider_name(), method.as_str(), &url, kind).await?;

        let response: CloudflareResponse<T> = HttpUtils::parse_json(&text, self.provider_name())?;

        if !response.success {
            let (code, message) = response.first_error();
            let error = self.map_error(RawApiError::with_code(code, message), context);
            if error.is_expected() {
                log::warn!("[{}] HTTP {status}: {error}", self.provider_name());
            } else {
                log::error!("[{}] HTTP {status}: {error}", self.provider_name());
            }
            return Err(error);
        }

        Ok(response)
    }

    /// Send a request and return its `result`.
    pub(crate) async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&RecordBody>,
        kind: RequestKind,
        context: ErrorContext,
    ) -> Result<T> {
        self.request_envelope(method, path, body, kind, context)
            .await?
            .result
            .ok_or_else(|| self.parse_error("missing `result` in response"))
    }

    /// GET every page of a list endpoint. `path` must already carry a query string.
    pub(crate) async fn get_all_pages<T: DeserializeOwned>(
        &self,
        path: &str,
        per_page: u32,
        context: ErrorContext,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let paged = format!("{path}&page={page}&per_page={per_page}");
            let response: CloudflareResponse<Vec<T>> = self
                .request_envelope(Method::GET, &paged, None, RequestKind::Read, context.clone())
                .await?;

            let total_pages = response.result_info.as_ref().map_or(1, |i| i.total_pages);
            let current = response.result_info.as_ref().map_or(page, |i| i.page);
            items.extend(response.result.unwrap_or_default());

            if current >= total_pages {
                break;
            }
            page = current + 1;
        }

        Ok(items)
    }
}
