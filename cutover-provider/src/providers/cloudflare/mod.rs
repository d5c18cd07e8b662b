//! Cloudflare DNS Provider

mod error;
mod http;
mod provider;
mod types;

use std::collections::HashMap;

use reqwest::Client;
use tokio::sync::RwLock;

use crate::providers::common::create_http_client;

pub(crate) use types::{CloudflareDnsRecord, CloudflareResponse, CloudflareZone, RecordBody};

pub(crate) const CF_API_BASE: &str = "https://api.cloudflare.com/client/v4";
/// Page size used when listing records (API maximum is 5000, default 100)
pub(crate) const RECORDS_PAGE_SIZE: u32 = 100;

/// Cloudflare DNS Provider
///
/// Zones are addressed by id. When no fixed zone id is configured, the zone of
/// each change's domain is looked up by name once and cached.
pub struct CloudflareProvider {
    pub(crate) client: Client,
    pub(crate) api_token: String,
    pub(crate) zone_id: Option<String>,
    pub(crate) api_base: String,
    pub(crate) zone_cache: RwLock<HashMap<String, String>>,
}

impl CloudflareProvider {
    pub fn new(api_token: String, zone_id: Option<String>) -> Self {
        Self {
            client: create_http_client(),
            api_token,
            zone_id,
            api_base: CF_API_BASE.to_string(),
            zone_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Send requests to another API root (proxy, local stub).
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }
}
