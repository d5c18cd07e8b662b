//! Public types used by toolbox operations.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// DNS record type for propagation lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DnsQueryType {
    /// IPv4 address record.
    A,
    /// IPv6 address record.
    Aaaa,
    /// Canonical name (alias) record.
    Cname,
    /// Mail exchange record.
    Mx,
    /// Text record.
    Txt,
    /// Name server record.
    Ns,
    /// Service locator record.
    Srv,
    /// Certificate Authority Authorization record.
    Caa,
    /// Pointer record (reverse DNS).
    Ptr,
}

impl fmt::Display for DnsQueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::Aaaa => write!(f, "AAAA"),
            Self::Cname => write!(f, "CNAME"),
            Self::Mx => write!(f, "MX"),
            Self::Txt => write!(f, "TXT"),
            Self::Ns => write!(f, "NS"),
            Self::Srv => write!(f, "SRV"),
            Self::Caa => write!(f, "CAA"),
            Self::Ptr => write!(f, "PTR"),
        }
    }
}

impl FromStr for DnsQueryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::Aaaa),
            "CNAME" => Ok(Self::Cname),
            "MX" => Ok(Self::Mx),
            "TXT" => Ok(Self::Txt),
            "NS" => Ok(Self::Ns),
            "SRV" => Ok(Self::Srv),
            "CAA" => Ok(Self::Caa),
            "PTR" => Ok(Self::Ptr),
            _ => Err(format!("Unsupported DNS query type: {s}")),
        }
    }
}

// ===== Health checks =====

/// Kind of test a health check performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthCheckType {
    Http,
    Tcp,
}

impl fmt::Display for HealthCheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Tcp => write!(f, "tcp"),
        }
    }
}

fn default_expected_status() -> u16 {
    200
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_retry_interval_secs() -> u64 {
    2
}

/// A health check run before or after the DNS switch.
///
/// HTTP checks pass when the response status equals `expected_status`; TCP
/// checks pass when a connection to `host:port` is established in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub id: String,
    pub name: String,
    #[serde(alias = "type")]
    pub check_type: HealthCheckType,
    /// Target URL for HTTP checks. A missing scheme means `https://`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default = "default_expected_status")]
    pub expected_status: u16,
    #[serde(default)]
    pub skip_tls_verify: bool,
    /// Per-attempt timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts after the first failure.
    #[serde(default)]
    pub retries: u32,
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
}

impl HealthCheck {
    fn base(id: impl Into<String>, name: impl Into<String>, check_type: HealthCheckType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            check_type,
            url: None,
            host: None,
            port: None,
            expected_status: default_expected_status(),
            skip_tls_verify: false,
            timeout_secs: default_timeout_secs(),
            retries: 0,
            retry_interval_secs: default_retry_interval_secs(),
        }
    }

    pub fn http(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::base(id, name, HealthCheckType::Http)
        }
    }

    pub fn tcp(
        id: impl Into<String>,
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            host: Some(host.into()),
            port: Some(port),
            ..Self::base(id, name, HealthCheckType::Tcp)
        }
    }

    #[must_use]
    pub fn with_expected_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    #[must_use]
    pub fn with_skip_tls_verify(mut self, skip: bool) -> Self {
        self.skip_tls_verify = skip;
        self
    }

    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn with_retries(mut self, retries: u32, interval_secs: u64) -> Self {
        self.retries = retries;
        self.retry_interval_secs = interval_secs;
        self
    }

    /// Human-readable target, e.g. `https://app.example.com/health` or `db.internal:5432`.
    pub fn target(&self) -> String {
        match self.check_type {
            HealthCheckType::Http => self.url.clone().unwrap_or_default(),
            HealthCheckType::Tcp => format!(
                "{}:{}",
                self.host.as_deref().unwrap_or_default(),
                self.port.unwrap_or_default()
            ),
        }
    }

    /// Validation messages; empty when the check is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let label = if self.id.is_empty() {
            self.name.as_str()
        } else {
            self.id.as_str()
        };

        if self.id.trim().is_empty() {
            errors.push(format!("Health check '{label}': id is required"));
        }
        if self.name.trim().is_empty() {
            errors.push(format!("Health check '{label}': name is required"));
        }
        if self.timeout_secs == 0 {
            errors.push(format!("Health check '{label}': timeout must be positive"));
        }

        match self.check_type {
            HealthCheckType::Http => match self.url.as_deref().map(str::trim) {
                None | Some("") => {
                    errors.push(format!("Health check '{label}': HTTP check requires a url"));
                }
                Some(url) => {
                    if url::Url::parse(&crate::services::normalize_url(url)).is_err() {
                        errors.push(format!("Health check '{label}': invalid url '{url}'"));
                    }
                }
            },
            HealthCheckType::Tcp => {
                if self.host.as_deref().map_or(true, |h| h.trim().is_empty()) {
                    errors.push(format!("Health check '{label}': TCP check requires a host"));
                }
                if matches!(self.port, None | Some(0)) {
                    errors.push(format!("Health check '{label}': TCP check requires a port"));
                }
            }
        }

        errors
    }
}

/// Outcome of one health check run, including retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub check_id: String,
    pub passed: bool,
    pub detail: String,
    /// HTTP status of the last attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub response_time_ms: u64,
    pub attempts: u32,
}

impl HealthCheckResult {
    pub fn passed(check_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            check_id: check_id.into(),
            passed: true,
            detail: detail.into(),
            status_code: None,
            response_time_ms: 0,
            attempts: 1,
        }
    }

    pub fn failed(check_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            ..Self::passed(check_id, detail)
        }
    }
}

// ===== Propagation =====

/// What a propagation check waits for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationQuery {
    /// Fully-qualified name to resolve.
    pub domain: String,
    pub record_type: DnsQueryType,
    pub expected_value: String,
}

impl PropagationQuery {
    pub fn new(
        domain: impl Into<String>,
        record_type: DnsQueryType,
        expected_value: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            record_type,
            expected_value: expected_value.into(),
        }
    }
}

/// A public resolver queried during propagation checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationServer {
    /// Human-readable name (e.g. `"Google DNS"`).
    pub name: String,
    pub ip: IpAddr,
}

impl PropagationServer {
    pub fn new(name: impl Into<String>, ip: IpAddr) -> Self {
        Self {
            name: name.into(),
            ip,
        }
    }
}

impl fmt::Display for PropagationServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.ip)
    }
}

/// Google, Cloudflare and Quad9 public resolvers.
pub fn default_nameservers() -> Vec<PropagationServer> {
    vec![
        PropagationServer::new("Google DNS", IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))),
        PropagationServer::new("Cloudflare DNS", IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1))),
        PropagationServer::new("Quad9 DNS", IpAddr::V4(Ipv4Addr::new(9, 9, 9, 9))),
    ]
}

/// How many nameservers must return the expected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quorum {
    #[default]
    All,
    AtLeast(usize),
}

impl Quorum {
    /// Number of matching answers required out of `total` nameservers.
    ///
    /// `AtLeast(n)` is clamped to `1..=total`.
    pub fn required(self, total: usize) -> usize {
        match self {
            Self::All => total,
            Self::AtLeast(n) => n.clamp(1, total.max(1)).min(total),
        }
    }
}

/// Knobs for [`ToolboxService::wait_for_propagation`](crate::ToolboxService::wait_for_propagation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationOptions {
    pub nameservers: Vec<PropagationServer>,
    /// Shared deadline for all rounds.
    pub timeout: Duration,
    /// Pause between rounds.
    pub interval: Duration,
    pub quorum: Quorum,
}

impl Default for PropagationOptions {
    fn default() -> Self {
        Self {
            nameservers: default_nameservers(),
            timeout: Duration::from_secs(300),
            interval: Duration::from_secs(10),
            quorum: Quorum::All,
        }
    }
}

/// Per-nameserver status in a propagation round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropagationStatus {
    Matched,
    Mismatch,
    Error,
    Timeout,
}

/// Result from a single nameserver in one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameserverResult {
    pub server: PropagationServer,
    pub status: PropagationStatus,
    /// Values returned by the nameserver.
    pub answers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub response_time_ms: u64,
}

/// Final state of a propagation wait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationOutcome {
    pub propagated: bool,
    pub rounds: u32,
    /// Per-nameserver results of the last round.
    pub results: Vec<NameserverResult>,
    pub elapsed_ms: u64,
}

impl PropagationOutcome {
    pub fn matched_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == PropagationStatus::Matched)
            .count()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_dns_query_type_from_str_case_insensitive() {
        assert_eq!("a".parse::<DnsQueryType>().unwrap(), DnsQueryType::A);
        assert_eq!("aaaa".parse::<DnsQueryType>().unwrap(), DnsQueryType::Aaaa);
        assert_eq!("Cname".parse::<DnsQueryType>().unwrap(), DnsQueryType::Cname);
        assert!("SOA".parse::<DnsQueryType>().is_err());
        assert!("".parse::<DnsQueryType>().is_err());
    }

    #[test]
    fn test_dns_query_type_display_parses_back() {
        for variant in [
            DnsQueryType::A,
            DnsQueryType::Aaaa,
            DnsQueryType::Cname,
            DnsQueryType::Mx,
            DnsQueryType::Txt,
            DnsQueryType::Ns,
            DnsQueryType::Srv,
            DnsQueryType::Caa,
            DnsQueryType::Ptr,
        ] {
            assert_eq!(variant.to_string().parse::<DnsQueryType>().unwrap(), variant);
        }
    }

    #[test]
    fn test_health_check_defaults_from_json() {
        let check: HealthCheck = serde_json::from_str(
            r#"{"id":"web","name":"Web","type":"http","url":"app.example.com/health"}"#,
        )
        .unwrap();
        assert_eq!(check.check_type, HealthCheckType::Http);
        assert_eq!(check.expected_status, 200);
        assert_eq!(check.timeout_secs, 10);
        assert_eq!(check.retries, 0);
        assert_eq!(check.retry_interval_secs, 2);
        assert!(!check.skip_tls_verify);
        assert!(check.validate().is_empty());
    }

    #[test]
    fn test_health_check_validate_http_requires_url() {
        let mut check = HealthCheck::http("web", "Web", "");
        let errors = check.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("requires a url"));

        check.url = None;
        assert_eq!(check.validate().len(), 1);
    }

    #[test]
    fn test_health_check_validate_tcp() {
        assert!(HealthCheck::tcp("db", "Database", "db.internal", 5432)
            .validate()
            .is_empty());

        let errors = HealthCheck::tcp("db", "Database", " ", 0).validate();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_health_check_validate_identity() {
        let errors = HealthCheck::http("", "", "https://example.com")
            .with_timeout_secs(0)
            .validate();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_health_check_target() {
        assert_eq!(
            HealthCheck::tcp("db", "Database", "10.0.0.5", 5432).target(),
            "10.0.0.5:5432"
        );
        assert_eq!(
            HealthCheck::http("web", "Web", "https://example.com").target(),
            "https://example.com"
        );
    }

    #[test]
    fn test_quorum_required() {
        assert_eq!(Quorum::All.required(3), 3);
        assert_eq!(Quorum::AtLeast(2).required(3), 2);
        assert_eq!(Quorum::AtLeast(5).required(3), 3);
        assert_eq!(Quorum::AtLeast(0).required(3), 1);
        assert_eq!(Quorum::AtLeast(2).required(0), 0);
    }

    #[test]
    fn test_default_propagation_options() {
        let options = PropagationOptions::default();
        let ips: Vec<String> = options
            .nameservers
            .iter()
            .map(|s| s.ip.to_string())
            .collect();
        assert_eq!(ips, vec!["8.8.8.8", "1.1.1.1", "9.9.9.9"]);
        assert_eq!(options.quorum, Quorum::All);
    }

    #[test]
    fn test_quorum_serde() {
        assert_eq!(serde_json::to_string(&Quorum::All).unwrap(), "\"all\"");
        let q: Quorum = serde_json::from_str(r#"{"at_least":2}"#).unwrap();
        assert_eq!(q, Quorum::AtLeast(2));
    }
}
