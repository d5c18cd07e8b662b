//! AWS Route 53 DNS Provider

mod error;
mod http;
mod provider;
mod sign;
mod types;

use std::collections::HashMap;

use reqwest::Client;
use tokio::sync::RwLock;

use crate::providers::common::create_http_client;

pub(crate) const R53_HOST: &str = "route53.amazonaws.com";
pub(crate) const R53_API_VERSION: &str = "2013-04-01";
pub(crate) const R53_SERVICE: &str = "route53";
/// Route 53 is a global service signed against `us-east-1`
pub(crate) const DEFAULT_REGION: &str = "us-east-1";

/// AWS Route 53 DNS Provider
///
/// Record sets are addressed by name and type; the synthetic record id of a
/// set is `"<fqdn>|<TYPE>"`.
pub struct Route53Provider {
    pub(crate) client: Client,
    pub(crate) access_key_id: String,
    pub(crate) secret_access_key: String,
    pub(crate) session_token: Option<String>,
    pub(crate) region: String,
    pub(crate) hosted_zone_id: Option<String>,
    /// Scheme and authority requests go to.
    pub(crate) endpoint: String,
    pub(crate) zone_cache: RwLock<HashMap<String, String>>,
}

impl Route53Provider {
    pub fn new(
        access_key_id: String,
        secret_access_key: String,
        session_token: Option<String>,
        region: Option<String>,
        hosted_zone_id: Option<String>,
    ) -> Self {
        Self {
            client: create_http_client(),
            access_key_id,
            secret_access_key,
            session_token,
            region: region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
            hosted_zone_id: hosted_zone_id.map(|id| types::strip_zone_prefix(&id)),
            endpoint: format!("https://{R53_HOST}"),
            zone_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Send requests to another endpoint (VPC endpoint, local stub).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// `Host` value covered by the signature.
    pub(crate) fn signing_host(&self) -> &str {
        self.endpoint
            .split_once("://")
            .map_or(self.endpoint.as_str(), |(_, host)| host)
    }
}
