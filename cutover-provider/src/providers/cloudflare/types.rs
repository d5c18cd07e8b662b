//! Cloudflare API types

use serde::{Deserialize, Serialize};

use crate::providers::common::values_match;
use crate::types::{DnsChange, DnsRecordType};

/// Cloudflare v4 response envelope
#[derive(Debug, Deserialize)]
pub struct CloudflareResponse<T> {
    pub success: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub errors: Vec<CloudflareError>,
    pub result_info: Option<CloudflareResultInfo>,
}

impl<T> CloudflareResponse<T> {
    /// First API error as `(code, message)`.
    pub fn first_error(&self) -> (String, String) {
        self.errors.first().map_or_else(
            || (String::new(), "Unknown error".to_string()),
            |e| (e.code.to_string(), e.message.clone()),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct CloudflareError {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct CloudflareResultInfo {
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
}

#[derive(Debug, Deserialize)]
pub struct CloudflareZone {
    pub id: String,
    pub name: String,
}

/// A DNS record as returned by the API
#[derive(Debug, Deserialize)]
pub struct CloudflareDnsRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    #[serde(default)]
    pub content: String,
    pub ttl: u32,
    pub priority: Option<u16>,
    /// Structured data for SRV and similar types
    pub data: Option<CloudflareSrvData>,
}

impl CloudflareDnsRecord {
    /// The value a `DnsChange` would carry for this record.
    ///
    /// SRV content is `"<weight> <port> <target>"`; the change only holds the target.
    pub fn change_value(&self) -> &str {
        match &self.data {
            Some(data) if self.record_type.eq_ignore_ascii_case("SRV") => &data.target,
            _ => &self.content,
        }
    }

    pub fn matches_value(&self, value: &str) -> bool {
        values_match(self.change_value(), value)
    }
}

/// SRV `data` object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudflareSrvData {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
}

/// Body of a create (POST) or overwrite (PUT) request
#[derive(Debug, Serialize)]
pub struct RecordBody {
    #[serde(rename = "type")]
    pub record_type: &'static str,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<CloudflareSrvData>,
}

impl RecordBody {
    /// Body that sets the record to `change.new_value`.
    pub fn from_change(change: &DnsChange) -> Self {
        let mut body = Self {
            record_type: change.record_type.as_str(),
            name: change.fqdn(),
            content: Some(change.new_value.clone()),
            ttl: change.ttl,
            priority: None,
            data: None,
        };

        match change.record_type {
            DnsRecordType::Mx => body.priority = change.priority,
            DnsRecordType::Srv => {
                body.content = None;
                body.data = Some(CloudflareSrvData {
                    priority: change.priority.unwrap_or_default(),
                    weight: change.weight.unwrap_or_default(),
                    port: change.port.unwrap_or_default(),
                    target: change.new_value.clone(),
                });
            }
            _ => {}
        }

        body
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_body_for_a_record() {
        let change = DnsChange::new("c1", "example.com", DnsRecordType::A, "www", "5.6.7.8")
            .with_ttl(120);
        let json = serde_json::to_value(RecordBody::from_change(&change)).unwrap();
        assert_eq!(json["type"], "A");
        assert_eq!(json["name"], "www.example.com");
        assert_eq!(json["content"], "5.6.7.8");
        assert_eq!(json["ttl"], 120);
        assert!(json.get("priority").is_none());
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_body_for_mx_carries_priority() {
        let change = DnsChange::new("mx", "example.com", DnsRecordType::Mx, "@", "mx.example.com")
            .with_priority(10);
        let json = serde_json::to_value(RecordBody::from_change(&change)).unwrap();
        assert_eq!(json["priority"], 10);
        assert_eq!(json["name"], "example.com");
    }

    #[test]
    fn test_body_for_srv_uses_data_object() {
        let change = DnsChange::new(
            "srv",
            "example.com",
            DnsRecordType::Srv,
            "_sip._tcp",
            "sip.example.com",
        )
        .with_srv(10, 5, 5060);
        let json = serde_json::to_value(RecordBody::from_change(&change)).unwrap();
        assert!(json.get("content").is_none());
        assert_eq!(json["data"]["port"], 5060);
        assert_eq!(json["data"]["target"], "sip.example.com");
    }

    #[test]
    fn test_srv_record_change_value_is_target() {
        let json = r#"{
            "id": "r1", "type": "SRV", "name": "_sip._tcp.example.com",
            "content": "5 5060 sip.example.com", "ttl": 300, "priority": 10,
            "data": {"priority": 10, "weight": 5, "port": 5060, "target": "sip.example.com"}
        }"#;
        let record: CloudflareDnsRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.change_value(), "sip.example.com");
        assert!(record.matches_value("SIP.example.com."));
    }

    #[test]
    fn test_failed_envelope_first_error() {
        let json = r#"{"success":false,"result":null,"errors":[{"code":81044,"message":"Record does not exist."}]}"#;
        let resp: CloudflareResponse<CloudflareDnsRecord> = serde_json::from_str(json).unwrap();
        assert!(!resp.success);
        assert_eq!(
            resp.first_error(),
            ("81044".to_string(), "Record does not exist.".to_string())
        );
    }
}
