use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============ Provider Types ============

/// Identifies which DNS provider implementation to use.
///
/// `Manual` is always available; the others are gated behind feature flags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// Prints operator instructions instead of calling an API.
    Manual,
    /// Cloudflare DNS. Requires feature `cloudflare`.
    #[cfg(feature = "cloudflare")]
    Cloudflare,
    /// AWS Route 53. Requires feature `route53`.
    #[cfg(feature = "route53")]
    Route53,
}

impl ProviderType {
    /// Registry key / identifier of the provider.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            #[cfg(feature = "cloudflare")]
            Self::Cloudflare => "cloudflare",
            #[cfg(feature = "route53")]
            Self::Route53 => "route53",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            #[cfg(feature = "cloudflare")]
            "cloudflare" => Ok(Self::Cloudflare),
            #[cfg(feature = "route53")]
            "route53" => Ok(Self::Route53),
            _ => Err(format!(
                "Unknown or disabled DNS provider: {s} (expected manual|cloudflare|route53)"
            )),
        }
    }
}

// ============ DNS Record Types ============

/// DNS record type handled by a cutover.
///
/// Serialized as uppercase strings (`"A"`, `"AAAA"`, `"CNAME"`, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DnsRecordType {
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

impl DnsRecordType {
    /// Uppercase wire name of the record type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Cname => "CNAME",
            Self::Mx => "MX",
            Self::Txt => "TXT",
            Self::Ns => "NS",
            Self::Srv => "SRV",
            Self::Caa => "CAA",
            Self::Ptr => "PTR",
        }
    }
}

impl fmt::Display for DnsRecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DnsRecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::Aaaa),
            "CNAME" => Ok(Self::Cname),
            "MX" => Ok(Self::Mx),
            "TXT" => Ok(Self::Txt),
            "NS" => Ok(Self::Ns),
            "SRV" => Ok(Self::Srv),
            "CAA" => Ok(Self::Caa),
            "PTR" => Ok(Self::Ptr),
            _ => Err(format!("Unsupported DNS record type: {s}")),
        }
    }
}

/// A DNS record as returned by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Provider-specific record identifier.
    pub id: String,
    /// Zone apex the record belongs to (e.g. `"example.com"`).
    pub domain: String,
    /// Relative record name (`"www"`, or `"@"` for the apex).
    pub name: String,
    /// Record type.
    pub record_type: DnsRecordType,
    /// Primary record value (address, target, text, ...).
    pub value: String,
    /// Time to live in seconds.
    pub ttl: u32,
    /// Priority (MX / SRV).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    /// Weight (SRV).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u16>,
    /// Port (SRV).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

// ============ DNS Change ============

/// Lifecycle of a single DNS change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DnsChangeStatus {
    /// Not yet sent to the provider.
    #[default]
    Pending,
    /// Accepted by the provider.
    Applied,
    /// Reverted to its previous value.
    RolledBack,
    /// The provider rejected the change.
    Failed,
}

impl fmt::Display for DnsChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Applied => "applied",
            Self::RolledBack => "rolled_back",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

fn default_ttl() -> u32 {
    300
}

/// A single DNS record change that a cutover applies (and may revert).
///
/// `old_value` is the value captured before the cutover. A change whose old
/// value was never captured cannot be reverted mechanically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsChange {
    /// Unique id within the plan.
    pub id: String,
    /// Zone apex (e.g. `"example.com"`).
    pub domain: String,
    /// Record type.
    #[serde(alias = "type")]
    pub record_type: DnsRecordType,
    /// Relative record name, `"@"` for the apex.
    pub name: String,
    /// Value before the cutover; empty when the record is new.
    #[serde(default)]
    pub old_value: String,
    /// Value after the cutover.
    pub new_value: String,
    /// TTL in seconds.
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    /// Priority (MX / SRV).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    /// Weight (SRV).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u16>,
    /// Port (SRV).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Provider that applied the change.
    #[serde(default)]
    pub provider: String,
    /// Provider-side record id, populated on apply.
    #[serde(default)]
    pub provider_record_id: String,
    /// Current status.
    #[serde(default)]
    pub status: DnsChangeStatus,
    /// When the provider accepted the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
    /// When the change was reverted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolled_back_at: Option<DateTime<Utc>>,
}

impl DnsChange {
    /// Create a pending change with the default TTL.
    pub fn new(
        id: impl Into<String>,
        domain: impl Into<String>,
        record_type: DnsRecordType,
        name: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            domain: domain.into(),
            record_type,
            name: name.into(),
            old_value: String::new(),
            new_value: new_value.into(),
            ttl: default_ttl(),
            priority: None,
            weight: None,
            port: None,
            provider: String::new(),
            provider_record_id: String::new(),
            status: DnsChangeStatus::Pending,
            applied_at: None,
            rolled_back_at: None,
        }
    }

    #[must_use]
    pub fn with_old_value(mut self, old_value: impl Into<String>) -> Self {
        self.old_value = old_value.into();
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn with_srv(mut self, priority: u16, weight: u16, port: u16) -> Self {
        self.priority = Some(priority);
        self.weight = Some(weight);
        self.port = Some(port);
        self
    }

    /// Fully-qualified record name without a trailing dot.
    ///
    /// `"@"` (or an empty name) resolves to the zone apex; names that already
    /// end with the zone are returned unchanged.
    pub fn fqdn(&self) -> String {
        let domain = self.domain.trim_end_matches('.');
        let name = self.name.trim_end_matches('.');
        if name.is_empty() || name == "@" {
            domain.to_string()
        } else if name.eq_ignore_ascii_case(domain)
            || name
                .to_lowercase()
                .ends_with(&format!(".{}", domain.to_lowercase()))
        {
            name.to_string()
        } else {
            format!("{name}.{domain}")
        }
    }

    /// Short human-readable label, e.g. `A www.example.com`.
    pub fn describe(&self) -> String {
        format!("{} {}", self.record_type, self.fqdn())
    }

    /// Validation messages for this change; empty when valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let label = if self.id.is_empty() {
            "<unnamed>"
        } else {
            self.id.as_str()
        };

        if self.id.trim().is_empty() {
            errors.push("DNS change id is required".to_string());
        }
        if self.domain.trim().is_empty() {
            errors.push(format!("DNS change '{label}': domain is required"));
        }
        if self.name.trim().is_empty() {
            errors.push(format!(
                "DNS change '{label}': name is required (use '@' for the apex)"
            ));
        }
        if self.new_value.trim().is_empty() {
            errors.push(format!("DNS change '{label}': new value is required"));
        }
        if self.ttl == 0 {
            errors.push(format!("DNS change '{label}': TTL must be positive"));
        }

        match self.record_type {
            DnsRecordType::Mx if self.priority.is_none() => {
                errors.push(format!("DNS change '{label}': MX record requires a priority"));
            }
            DnsRecordType::Srv
                if self.priority.is_none() || self.weight.is_none() || self.port.is_none() =>
            {
                errors.push(format!(
                    "DNS change '{label}': SRV record requires priority, weight and port together"
                ));
            }
            _ => {}
        }

        errors
    }

    /// Whether the change can be mechanically reverted.
    pub fn can_rollback(&self) -> bool {
        self.status == DnsChangeStatus::Applied && !self.old_value.is_empty()
    }

    /// Record a successful apply.
    pub fn mark_applied(&mut self, provider: &str, record_id: impl Into<String>) {
        self.provider = provider.to_string();
        self.provider_record_id = record_id.into();
        self.status = DnsChangeStatus::Applied;
        self.applied_at = Some(Utc::now());
    }

    /// Record a rejected apply.
    pub fn mark_failed(&mut self) {
        self.status = DnsChangeStatus::Failed;
    }

    /// Record a successful revert.
    pub fn mark_rolled_back(&mut self) {
        self.status = DnsChangeStatus::RolledBack;
        self.rolled_back_at = Some(Utc::now());
    }

    /// A copy that writes `old_value` back, used to issue the revert update.
    #[must_use]
    pub fn reverted(&self) -> Self {
        let mut revert = self.clone();
        revert.old_value = self.new_value.clone();
        revert.new_value = self.old_value.clone();
        revert
    }
}

// ============ Provider Metadata Types ============

/// The input type of a credential field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Plain text input.
    Text,
    /// Secret input.
    Password,
}

/// Definition of a single credential field required by a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentialField {
    /// Machine-readable field key (e.g., `"apiToken"`).
    pub key: String,
    /// Human-readable label (e.g., `"API Token"`).
    pub label: String,
    /// Input type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Environment variable the runner reads this field from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_var: Option<String>,
    /// Whether the field may be omitted.
    pub optional: bool,
}

/// Static metadata describing a DNS provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetadata {
    /// Provider type identifier.
    pub id: ProviderType,
    /// Human-readable provider name.
    pub name: String,
    /// Short description of the provider.
    pub description: String,
    /// Credential fields used to authenticate with this provider.
    pub required_fields: Vec<ProviderCredentialField>,
}

// ============ Credential Types ============

/// Validation error for provider credentials.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CredentialValidationError {
    /// A required credential field is missing entirely.
    MissingField {
        /// Which provider the error relates to.
        provider: ProviderType,
        /// Machine-readable field key.
        field: String,
        /// Human-readable field label.
        label: String,
    },
    /// A credential field is present but empty/whitespace-only.
    EmptyField {
        /// Which provider the error relates to.
        provider: ProviderType,
        /// Machine-readable field key.
        field: String,
        /// Human-readable field label.
        label: String,
    },
}

impl fmt::Display for CredentialValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField {
                provider, label, ..
            } => write!(f, "[{provider}] Missing required field: {label}"),
            Self::EmptyField {
                provider, label, ..
            } => write!(f, "[{provider}] Field must not be empty: {label}"),
        }
    }
}

impl std::error::Error for CredentialValidationError {}

/// Type-safe credential container for all supported DNS providers.
///
/// Passed into [`create_provider()`](crate::create_provider); never stored on a plan.
///
/// ```json
/// { "provider": "cloudflare", "credentials": { "api_token": "...", "zone_id": null } }
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "provider", content = "credentials")]
pub enum ProviderCredentials {
    /// No credentials: changes are printed for the operator.
    #[serde(rename = "manual")]
    Manual,

    /// Cloudflare credentials. Requires feature `cloudflare`.
    #[cfg(feature = "cloudflare")]
    #[serde(rename = "cloudflare")]
    Cloudflare {
        /// Cloudflare API token.
        api_token: String,
        /// Fixed zone id; resolved from the domain name when absent.
        #[serde(default)]
        zone_id: Option<String>,
    },

    /// AWS Route 53 credentials. Requires feature `route53`.
    #[cfg(feature = "route53")]
    #[serde(rename = "route53")]
    Route53 {
        /// AWS access key id.
        access_key_id: String,
        /// AWS secret access key.
        secret_access_key: String,
        /// Session token for temporary credentials.
        #[serde(default)]
        session_token: Option<String>,
        /// Signing region (Route 53 is global; defaults to `us-east-1`).
        #[serde(default)]
        region: Option<String>,
        /// Fixed hosted zone id; resolved from the domain name when absent.
        #[serde(default)]
        hosted_zone_id: Option<String>,
    },
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => f.write_str("Manual"),
            #[cfg(feature = "cloudflare")]
            Self::Cloudflare { zone_id, .. } => f
                .debug_struct("Cloudflare")
                .field("api_token", &"<redacted>")
                .field("zone_id", zone_id)
                .finish(),
            #[cfg(feature = "route53")]
            Self::Route53 {
                access_key_id,
                region,
                hosted_zone_id,
                ..
            } => f
                .debug_struct("Route53")
                .field(
                    "access_key_id",
                    &crate::utils::log_sanitizer::redact(access_key_id),
                )
                .field("secret_access_key", &"<redacted>")
                .field("region", region)
                .field("hosted_zone_id", hosted_zone_id)
                .finish(),
        }
    }
}

impl ProviderCredentials {
    /// The provider these credentials belong to.
    pub fn provider_type(&self) -> ProviderType {
        match self {
            Self::Manual => ProviderType::Manual,
            #[cfg(feature = "cloudflare")]
            Self::Cloudflare { .. } => ProviderType::Cloudflare,
            #[cfg(feature = "route53")]
            Self::Route53 { .. } => ProviderType::Route53,
        }
    }

    /// Construct credentials from a flat key/value map, validating required fields.
    ///
    /// Keys match [`ProviderCredentialField::key`] (e.g. `apiToken`, `accessKeyId`).
    pub fn from_map(
        provider: ProviderType,
        map: &std::collections::HashMap<String, String>,
    ) -> Result<Self, CredentialValidationError> {
        match provider {
            ProviderType::Manual => Ok(Self::Manual),
            #[cfg(feature = "cloudflare")]
            ProviderType::Cloudflare => Ok(Self::Cloudflare {
                api_token: Self::get_required_field(provider, map, "apiToken", "API Token")?,
                zone_id: Self::get_optional_field(map, "zoneId"),
            }),
            #[cfg(feature = "route53")]
            ProviderType::Route53 => Ok(Self::Route53 {
                access_key_id: Self::get_required_field(
                    provider,
                    map,
                    "accessKeyId",
                    "Access Key ID",
                )?,
                secret_access_key: Self::get_required_field(
                    provider,
                    map,
                    "secretAccessKey",
                    "Secret Access Key",
                )?,
                session_token: Self::get_optional_field(map, "sessionToken"),
                region: Self::get_optional_field(map, "region"),
                hosted_zone_id: Self::get_optional_field(map, "hostedZoneId"),
            }),
        }
    }

    fn get_required_field(
        provider: ProviderType,
        map: &std::collections::HashMap<String, String>,
        key: &str,
        label: &str,
    ) -> Result<String, CredentialValidationError> {
        match map.get(key) {
            None => Err(CredentialValidationError::MissingField {
                provider,
                field: key.to_string(),
                label: label.to_string(),
            }),
            Some(v) if v.trim().is_empty() => Err(CredentialValidationError::EmptyField {
                provider,
                field: key.to_string(),
                label: label.to_string(),
            }),
            Some(v) => Ok(v.trim().to_string()),
        }
    }

    #[cfg_attr(
        not(any(feature = "cloudflare", feature = "route53")),
        allow(dead_code)
    )]
    fn get_optional_field(
        map: &std::collections::HashMap<String, String>,
        key: &str,
    ) -> Option<String> {
        map.get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}
