//! Route 53 XML types and record value conversion

use serde::Deserialize;

use crate::providers::common::values_match;
use crate::types::{DnsChange, DnsRecordType};

/// `"/hostedzone/Z123"` → `"Z123"`
pub fn strip_zone_prefix(id: &str) -> String {
    id.trim_start_matches("/hostedzone/").to_string()
}

/// Absolute name with trailing dot, as Route 53 stores it.
pub fn absolute_name(name: &str) -> String {
    format!("{}.", name.trim_end_matches('.'))
}

/// Route 53 returns `*` as `\052`.
pub fn decode_name(name: &str) -> String {
    name.replace("\\052", "*").trim_end_matches('.').to_string()
}

#[derive(Debug, Deserialize)]
pub struct HostedZone {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct HostedZones {
    #[serde(rename = "HostedZone", default)]
    pub items: Vec<HostedZone>,
}

#[derive(Debug, Deserialize)]
pub struct ListHostedZonesByNameResponse {
    #[serde(rename = "HostedZones", default)]
    pub hosted_zones: HostedZones,
}

#[derive(Debug, Deserialize)]
pub struct ResourceRecordValue {
    #[serde(rename = "Value")]
    pub value: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResourceRecords {
    #[serde(rename = "ResourceRecord", default)]
    pub items: Vec<ResourceRecordValue>,
}

#[derive(Debug, Deserialize)]
pub struct ResourceRecordSet {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Type")]
    pub record_type: String,
    #[serde(rename = "TTL")]
    pub ttl: Option<u32>,
    /// Absent for alias record sets
    #[serde(rename = "ResourceRecords")]
    pub resource_records: Option<ResourceRecords>,
}

impl ResourceRecordSet {
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.resource_records
            .iter()
            .flat_map(|r| r.items.iter().map(|v| v.value.as_str()))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ResourceRecordSets {
    #[serde(rename = "ResourceRecordSet", default)]
    pub items: Vec<ResourceRecordSet>,
}

#[derive(Debug, Deserialize)]
pub struct ListResourceRecordSetsResponse {
    #[serde(rename = "ResourceRecordSets", default)]
    pub record_sets: ResourceRecordSets,
    #[serde(rename = "IsTruncated", default)]
    pub is_truncated: bool,
    #[serde(rename = "NextRecordName")]
    pub next_record_name: Option<String>,
    #[serde(rename = "NextRecordType")]
    pub next_record_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeInfo {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Status")]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeResourceRecordSetsResponse {
    #[serde(rename = "ChangeInfo")]
    pub change_info: ChangeInfo,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Message", default)]
    pub message: String,
}

/// `<ErrorResponse><Error>...</Error></ErrorResponse>`
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "Error")]
    pub error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
pub struct BatchMessages {
    #[serde(rename = "Message", default)]
    pub items: Vec<String>,
}

/// `<InvalidChangeBatch><Messages>...</Messages></InvalidChangeBatch>`
#[derive(Debug, Deserialize)]
pub struct InvalidChangeBatchResponse {
    #[serde(rename = "Messages", default)]
    pub messages: BatchMessages,
}

/// One `<Change>` of a change batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Create,
    Upsert,
    Delete,
}

impl ChangeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Upsert => "UPSERT",
            Self::Delete => "DELETE",
        }
    }
}

/// Record set contents to send in a change batch.
#[derive(Debug, Clone)]
pub struct RecordSetSpec {
    pub name: String,
    pub record_type: String,
    pub ttl: u32,
    pub values: Vec<String>,
}

impl RecordSetSpec {
    /// Record set that holds only `change.new_value`.
    pub fn from_change(change: &DnsChange) -> Self {
        Self {
            name: absolute_name(&change.fqdn()),
            record_type: change.record_type.as_str().to_string(),
            ttl: change.ttl,
            values: vec![encode_value(change)],
        }
    }

    /// `existing` with the value equal to `change.old_value` swapped for the new value.
    ///
    /// The other values of a multi-value set are kept; a single-value set is
    /// replaced outright.
    pub fn replacing(existing: &ResourceRecordSet, change: &DnsChange) -> Self {
        if existing.values().count() <= 1 {
            return Self::from_change(change);
        }

        let new_value = encode_value(change);
        let mut values: Vec<String> = existing
            .values()
            .filter(|raw| {
                let (value, ..) = decode_value(change.record_type, raw);
                !values_match(&value, &change.old_value) && *raw != new_value
            })
            .map(str::to_string)
            .collect();
        values.push(new_value);

        Self {
            name: absolute_name(&change.fqdn()),
            record_type: change.record_type.as_str().to_string(),
            ttl: change.ttl,
            values,
        }
    }

    /// Record set exactly as it currently exists, as `DELETE` requires.
    pub fn from_existing(set: &ResourceRecordSet) -> Self {
        Self {
            name: set.name.clone(),
            record_type: set.record_type.clone(),
            ttl: set.ttl.unwrap_or(300),
            values: set.values().map(str::to_string).collect(),
        }
    }
}

/// Change batch document for `ChangeResourceRecordSets`.
pub fn change_batch_xml(action: ChangeAction, set: &RecordSetSpec, comment: &str) -> String {
    use quick_xml::escape::escape;

    let records: String = set
        .values
        .iter()
        .map(|v| format!("<ResourceRecord><Value>{}</Value></ResourceRecord>", escape(v.as_str())))
        .collect();

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<ChangeResourceRecordSetsRequest xmlns="https://route53.amazonaws.com/doc/2013-04-01/">"#,
            "<ChangeBatch><Comment>{comment}</Comment><Changes><Change>",
            "<Action>{action}</Action>",
            "<ResourceRecordSet><Name>{name}</Name><Type>{rtype}</Type><TTL>{ttl}</TTL>",
            "<ResourceRecords>{records}</ResourceRecords>",
            "</ResourceRecordSet></Change></Changes></ChangeBatch>",
            "</ChangeResourceRecordSetsRequest>"
        ),
        comment = escape(comment),
        action = action.as_str(),
        name = escape(set.name.as_str()),
        rtype = set.record_type,
        ttl = set.ttl,
        records = records,
    )
}

/// Route 53 value for the change's new value (priority prefixes, TXT quoting).
pub fn encode_value(change: &DnsChange) -> String {
    let value = change.new_value.trim();
    match change.record_type {
        DnsRecordType::Mx => format!("{} {value}", change.priority.unwrap_or_default()),
        DnsRecordType::Srv => format!(
            "{} {} {} {value}",
            change.priority.unwrap_or_default(),
            change.weight.unwrap_or_default(),
            change.port.unwrap_or_default()
        ),
        DnsRecordType::Txt if !value.starts_with('"') => {
            format!("\"{}\"", value.replace('"', "\\\""))
        }
        _ => value.to_string(),
    }
}

/// Parsed Route 53 value: `(value, priority, weight, port)`.
pub fn decode_value(
    record_type: DnsRecordType,
    raw: &str,
) -> (String, Option<u16>, Option<u16>, Option<u16>) {
    let parts: Vec<&str> = raw.split_whitespace().collect();
    match (record_type, parts.as_slice()) {
        (DnsRecordType::Mx, [priority, target]) => {
            (target.to_string(), priority.parse().ok(), None, None)
        }
        (DnsRecordType::Srv, [priority, weight, port, target]) => (
            target.to_string(),
            priority.parse().ok(),
            weight.parse().ok(),
            port.parse().ok(),
        ),
        (DnsRecordType::Txt, _) => (
            raw.trim().trim_matches('"').replace("\\\"", "\""),
            None,
            None,
            None,
        ),
        _ => (raw.trim().to_string(), None, None, None),
    }
}
