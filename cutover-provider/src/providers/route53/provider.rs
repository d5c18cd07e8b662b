//! Route 53 `DnsProvider` implementation

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;

use crate::error::{ProviderError, Result};
use crate::http_client::RequestKind;
use crate::providers::common::{full_name_to_relative, parse_record_type};
use crate::traits::{DnsProvider, ErrorContext, ProviderErrorMapper};
use crate::types::{
    DnsChange, DnsRecord, DnsRecordType, FieldType, ProviderCredentialField, ProviderMetadata,
    ProviderType,
};

use super::types::{
    ChangeAction, ChangeInfo, ChangeResourceRecordSetsResponse, ListHostedZonesByNameResponse,
    ListResourceRecordSetsResponse, RecordSetSpec,
    ResourceRecordSet, absolute_name, change_batch_xml, decode_name, decode_value,
    strip_zone_prefix,
};
use super::{R53_API_VERSION, Route53Provider};

/// Synthetic record id of a record set.
pub(crate) fn record_id(fqdn: &str, record_type: DnsRecordType) -> String {
    format!("{}|{record_type}", fqdn.trim_end_matches('.'))
}

/// Max record sets per `ListResourceRecordSets` page
const RRSET_PAGE_SIZE: &str = "300";

impl Route53Provider {
    fn parse_record_id(&self, record_id: &str) -> Result<(String, DnsRecordType)> {
        let invalid = || ProviderError::InvalidParameter {
            provider: self.provider_name().to_string(),
            param: "record_id".to_string(),
            detail: format!("expected '<fqdn>|<TYPE>', got '{record_id}'"),
        };
        let (name, rtype) = record_id.rsplit_once('|').ok_or_else(invalid)?;
        let rtype = rtype.parse().map_err(|_| invalid())?;
        Ok((name.trim_end_matches('.').to_string(), rtype))
    }

    /// Hosted zone id for `domain`: the fixed id if configured, else cached lookup by name.
    pub(crate) async fn resolve_zone_id(&self, domain: &str) -> Result<String> {
        if let Some(zone_id) = &self.hosted_zone_id {
            return Ok(zone_id.clone());
        }

        let domain = domain.trim_end_matches('.').to_lowercase();
        if let Some(zone_id) = self.zone_cache.read().await.get(&domain) {
            return Ok(zone_id.clone());
        }

        let context = ErrorContext {
            domain: Some(domain.clone()),
            ..ErrorContext::default()
        };
        let resp: ListHostedZonesByNameResponse = self
            .call(
                Method::GET,
                &format!("/{R53_API_VERSION}/hostedzonesbyname"),
                &[("dnsname", domain.as_str()), ("maxitems", "1")],
                None,
                RequestKind::Read,
                context,
            )
            .await?;

        // The listing starts at `dnsname`; the first zone may be a different one
        let zone = resp
            .hosted_zones
            .items
            .into_iter()
            .find(|z| decode_name(&z.name).eq_ignore_ascii_case(&domain))
            .ok_or_else(|| ProviderError::DomainNotFound {
                provider: self.provider_name().to_string(),
                domain: domain.clone(),
                raw_message: None,
            })?;

        let zone_id = strip_zone_prefix(&zone.id);
        log::debug!("[route53] Hosted zone for {domain}: {zone_id}");
        self.zone_cache
            .write()
            .await
            .insert(domain, zone_id.clone());
        Ok(zone_id)
    }

    /// The record set with exactly this name and type, if any.
    pub(crate) async fn fetch_record_set(
        &self,
        zone_id: &str,
        fqdn: &str,
        record_type: DnsRecordType,
        context: ErrorContext,
    ) -> Result<Option<ResourceRecordSet>> {
        let name = absolute_name(fqdn);
        let resp: ListResourceRecordSetsResponse = self
            .call(
                Method::GET,
                &format!("/{R53_API_VERSION}/hostedzone/{zone_id}/rrset"),
                &[
                    ("name", name.as_str()),
                    ("type", record_type.as_str()),
                    ("maxitems", "1"),
                ],
                None,
                RequestKind::Read,
                context,
            )
            .await?;

        Ok(resp.record_sets.items.into_iter().find(|set| {
            decode_name(&set.name).eq_ignore_ascii_case(fqdn.trim_end_matches('.'))
                && set.record_type.eq_ignore_ascii_case(record_type.as_str())
        }))
    }

    /// Submit a single-change batch.
    pub(crate) async fn submit(
        &self,
        zone_id: &str,
        action: ChangeAction,
        set: &RecordSetSpec,
        context: ErrorContext,
    ) -> Result<ChangeInfo> {
        let comment = format!("dns-cutover {} {}", action.as_str(), set.name);
        let body = change_batch_xml(action, set, &comment);
        let resp: ChangeResourceRecordSetsResponse = self
            .call(
                Method::POST,
                &format!("/{R53_API_VERSION}/hostedzone/{zone_id}/rrset/"),
                &[],
                Some(body),
                RequestKind::Mutation,
                context,
            )
            .await?;
        log::debug!(
            "[route53] Change {} is {}",
            resp.change_info.id,
            resp.change_info.status
        );
        Ok(resp.change_info)
    }

    /// One `DnsRecord` per value of a record set. Unsupported types yield nothing.
    pub(crate) fn set_to_records(&self, set: &ResourceRecordSet, domain: &str) -> Vec<DnsRecord> {
        let Ok(record_type) = parse_record_type(&set.record_type, self.provider_name()) else {
            log::debug!("[route53] Skipping {} record set {}", set.record_type, set.name);
            return Vec::new();
        };
        let fqdn = decode_name(&set.name);
        let id = record_id(&fqdn, record_type);

        set.values()
            .map(|raw| {
                let (value, priority, weight, port) = decode_value(record_type, raw);
                DnsRecord {
                    id: id.clone(),
                    domain: domain.to_string(),
                    name: full_name_to_relative(&fqdn, domain),
                    record_type,
                    value,
                    ttl: set.ttl.unwrap_or_default(),
                    priority,
                    weight,
                    port,
                }
            })
            .collect()
    }

    async fn apply(&self, change: &mut DnsChange, action: ChangeAction) -> Result<()> {
        let zone_id = self.resolve_zone_id(&change.domain).await?;
        let context = ErrorContext::for_change(change);

        // UPSERT replaces the whole set; carry over the values this change does not touch
        let set = match action {
            ChangeAction::Upsert => self
                .fetch_record_set(&zone_id, &change.fqdn(), change.record_type, context.clone())
                .await?
                .map_or_else(
                    || RecordSetSpec::from_change(change),
                    |existing| RecordSetSpec::replacing(&existing, change),
                ),
            ChangeAction::Create | ChangeAction::Delete => RecordSetSpec::from_change(change),
        };
        let info = self.submit(&zone_id, action, &set, context).await?;

        log::info!(
            "[route53] {} {}: '{}' -> '{}' ({})",
            action.as_str(),
            change.describe(),
            change.old_value,
            change.new_value,
            info.id
        );
        change.mark_applied(self.id(), record_id(&change.fqdn(), change.record_type));
        Ok(())
    }
}

#[async_trait]
impl DnsProvider for Route53Provider {
    fn id(&self) -> &'static str {
        "route53"
    }

    fn metadata() -> ProviderMetadata {
        let field = |key: &str, label: &str, field_type: FieldType, env: &str, optional: bool| {
            ProviderCredentialField {
                key: key.to_string(),
                label: label.to_string(),
                field_type,
                env_var: Some(env.to_string()),
                optional,
            }
        };

        ProviderMetadata {
            id: ProviderType::Route53,
            name: "AWS Route 53".to_string(),
            description: "Amazon Route 53 via the 2013-04-01 REST API (SigV4)".to_string(),
            required_fields: vec![
                field("accessKeyId", "Access Key ID", FieldType::Text, "AWS_ACCESS_KEY_ID", false),
                field(
                    "secretAccessKey",
                    "Secret Access Key",
                    FieldType::Password,
                    "AWS_SECRET_ACCESS_KEY",
                    false,
                ),
                field(
                    "sessionToken",
                    "Session Token",
                    FieldType::Password,
                    "AWS_SESSION_TOKEN",
                    true,
                ),
                field("region", "Region", FieldType::Text, "AWS_REGION", true),
                field(
                    "hostedZoneId",
                    "Hosted Zone ID",
                    FieldType::Text,
                    "ROUTE53_HOSTED_ZONE_ID",
                    true,
                ),
            ],
        }
    }

    async fn validate_credentials(&self) -> Result<bool> {
        #[derive(Deserialize)]
        struct GetHostedZoneCountResponse {
            #[serde(rename = "HostedZoneCount")]
            hosted_zone_count: u64,
        }

        match self
            .call::<GetHostedZoneCountResponse>(
                Method::GET,
                &format!("/{R53_API_VERSION}/hostedzonecount"),
                &[],
                None,
                RequestKind::Read,
                ErrorContext::default(),
            )
            .await
        {
            Ok(resp) => {
                log::debug!("[route53] {} hosted zones visible", resp.hosted_zone_count);
                Ok(true)
            }
            Err(ProviderError::InvalidCredentials { .. } | ProviderError::PermissionDenied { .. }) => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn list_records(&self, domain: &str) -> Result<Vec<DnsRecord>> {
        let zone_id = self.resolve_zone_id(domain).await?;
        let path = format!("/{R53_API_VERSION}/hostedzone/{zone_id}/rrset");
        let mut records = Vec::new();
        let mut next: Option<(String, String)> = None;

        loop {
            let mut query = vec![("maxitems", RRSET_PAGE_SIZE)];
            if let Some((name, rtype)) = &next {
                query.push(("name", name.as_str()));
                query.push(("type", rtype.as_str()));
            }
            let context = ErrorContext {
                domain: Some(domain.to_string()),
                ..ErrorContext::default()
            };
            let resp: ListResourceRecordSetsResponse = self
                .call(Method::GET, &path, &query, None, RequestKind::Read, context)
                .await?;

            for set in &resp.record_sets.items {
                records.extend(self.set_to_records(set, domain));
            }

            match (resp.is_truncated, resp.next_record_name, resp.next_record_type) {
                (true, Some(name), Some(rtype)) => next = Some((name, rtype)),
                _ => break,
            }
        }

        Ok(records)
    }

    async fn get_record(&self, domain: &str, record_id: &str) -> Result<DnsRecord> {
        let (fqdn, record_type) = self.parse_record_id(record_id)?;
        let zone_id = self.resolve_zone_id(domain).await?;
        let context = ErrorContext {
            record_id: Some(record_id.to_string()),
            domain: Some(domain.to_string()),
            ..ErrorContext::default()
        };

        self.fetch_record_set(&zone_id, &fqdn, record_type, context)
            .await?
            .and_then(|set| self.set_to_records(&set, domain).into_iter().next())
            .ok_or_else(|| ProviderError::RecordNotFound {
                provider: self.provider_name().to_string(),
                record_id: record_id.to_string(),
                raw_message: None,
            })
    }

    async fn create_record(&self, change: &mut DnsChange) -> Result<()> {
        self.apply(change, ChangeAction::Create).await
    }

    async fn update_record(&self, change: &mut DnsChange) -> Result<()> {
        self.apply(change, ChangeAction::Upsert).await
    }

    async fn delete_record(&self, domain: &str, record_id: &str) -> Result<()> {
        let (fqdn, record_type) = self.parse_record_id(record_id)?;
        let zone_id = self.resolve_zone_id(domain).await?;
        let context = ErrorContext {
            record_name: Some(fqdn.clone()),
            record_id: Some(record_id.to_string()),
            domain: Some(domain.to_string()),
        };

        // DELETE must echo the record set exactly as stored
        let set = self
            .fetch_record_set(&zone_id, &fqdn, record_type, context.clone())
            .await?
            .ok_or_else(|| ProviderError::RecordNotFound {
                provider: self.provider_name().to_string(),
                record_id: record_id.to_string(),
                raw_message: None,
            })?;

        self.submit(
            &zone_id,
            ChangeAction::Delete,
            &RecordSetSpec::from_existing(&set),
            context,
        )
        .await?;
        log::info!("[route53] Deleted record set {record_id}");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::providers::route53::types::{ResourceRecordValue, ResourceRecords};

    fn provider(zone: Option<&str>) -> Route53Provider {
        Route53Provider::new(
            "AKID".to_string(),
            "secret".to_string(),
            None,
            None,
            zone.map(str::to_string),
        )
    }

    #[test]
    fn test_record_id_round_trip() {
        let p = provider(None);
        let id = record_id("www.example.com.", DnsRecordType::Cname);
        assert_eq!(id, "www.example.com|CNAME");
        let (name, rtype) = p.parse_record_id(&id).unwrap();
        assert_eq!(name, "www.example.com");
        assert_eq!(rtype, DnsRecordType::Cname);
        assert!(p.parse_record_id("no-separator").is_err());
        assert!(p.parse_record_id("x.example.com|SOA").is_err());
    }

    #[tokio::test]
    async fn test_fixed_zone_id_strips_prefix() {
        let p = provider(Some("/hostedzone/Z123"));
        assert_eq!(p.resolve_zone_id("example.com").await.unwrap(), "Z123");
    }

    #[test]
    fn test_set_to_records() {
        let set = ResourceRecordSet {
            name: "example.com.".to_string(),
            record_type: "MX".to_string(),
            ttl: Some(3600),
            resource_records: Some(ResourceRecords {
                items: vec![
                    ResourceRecordValue {
                        value: "10 mx1.example.com.".to_string(),
                    },
                    ResourceRecordValue {
                        value: "20 mx2.example.com.".to_string(),
                    },
                ],
            }),
        };
        let records = provider(None).set_to_records(&set, "example.com");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "@");
        assert_eq!(records[0].id, "example.com|MX");
        assert_eq!(records[1].priority, Some(20));
        assert_eq!(records[1].value, "mx2.example.com.");
    }

    #[test]
    fn test_unsupported_set_is_skipped() {
        let set = ResourceRecordSet {
            name: "example.com.".to_string(),
            record_type: "SOA".to_string(),
            ttl: Some(900),
            resource_records: None,
        };
        assert!(provider(None).set_to_records(&set, "example.com").is_empty());
    }

    #[test]
    fn test_metadata_env_vars() {
        let meta = Route53Provider::metadata();
        let env: Vec<_> = meta
            .required_fields
            .iter()
            .filter_map(|f| f.env_var.as_deref())
            .collect();
        assert!(env.contains(&"AWS_ACCESS_KEY_ID"));
        assert!(env.contains(&"ROUTE53_HOSTED_ZONE_ID"));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_bogus_credentials_are_rejected() {
        assert!(!provider(None).validate_credentials().await.unwrap());
    }
}
