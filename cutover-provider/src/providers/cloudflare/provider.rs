//! Cloudflare `DnsProvider` implementation

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;

use crate::error::{ProviderError, Result};
use crate::http_client::RequestKind;
use crate::providers::common::{full_name_to_relative, parse_record_type};
use crate::traits::{DnsProvider, ErrorContext, ProviderErrorMapper};
use crate::types::{
    DnsChange, DnsRecord, FieldType, ProviderCredentialField, ProviderMetadata, ProviderType,
};

use super::{CloudflareDnsRecord, CloudflareProvider, CloudflareZone, RECORDS_PAGE_SIZE, RecordBody};

impl CloudflareProvider {
    /// Zone id for `domain`: the fixed id if configured, else cached lookup by name.
    pub(crate) async fn resolve_zone_id(&self, domain: &str) -> Result<String> {
        if let Some(zone_id) = &self.zone_id {
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
        let zones: Vec<CloudflareZone> = self
            .request(
                Method::GET,
                &format!("/zones?name={}", urlencoding::encode(&domain)),
                None,
                RequestKind::Read,
                context,
            )
            .await?;

        let zone = zones
            .into_iter()
            .find(|z| z.name.eq_ignore_ascii_case(&domain))
            .ok_or_else(|| ProviderError::DomainNotFound {
                provider: self.provider_name().to_string(),
                domain: domain.clone(),
                raw_message: None,
            })?;

        log::debug!("[cloudflare] Zone for {domain}: {}", zone.id);
        self.zone_cache
            .write()
            .await
            .insert(domain, zone.id.clone());
        Ok(zone.id)
    }

    /// Locate the live record a change refers to.
    ///
    /// Prefers the record whose value equals `value`; falls back to the only
    /// record of that name and type.
    pub(crate) async fn find_record(
        &self,
        zone_id: &str,
        change: &DnsChange,
        value: &str,
    ) -> Result<CloudflareDnsRecord> {
        let fqdn = change.fqdn();
        let path = format!(
            "/zones/{zone_id}/dns_records?type={}&name={}",
            change.record_type,
            urlencoding::encode(&fqdn)
        );
        let mut records: Vec<CloudflareDnsRecord> = self
            .get_all_pages(&path, RECORDS_PAGE_SIZE, ErrorContext::for_change(change))
            .await?;

        if let Some(pos) = records.iter().position(|r| r.matches_value(value)) {
            return Ok(records.swap_remove(pos));
        }
        if records.len() == 1
            && let Some(record) = records.pop()
        {
            log::warn!(
                "[cloudflare] {} has value '{}', expected '{value}'; updating it anyway",
                change.describe(),
                record.change_value()
            );
            return Ok(record);
        }

        Err(ProviderError::RecordNotFound {
            provider: self.provider_name().to_string(),
            record_id: format!("{fqdn} ({})", change.record_type),
            raw_message: (!records.is_empty())
                .then(|| format!("{} records of that name, none with value '{value}'", records.len())),
        })
    }

    pub(crate) fn cf_record_to_dns_record(
        &self,
        cf_record: CloudflareDnsRecord,
        domain: &str,
    ) -> Result<DnsRecord> {
        let record_type = parse_record_type(&cf_record.record_type, self.provider_name())?;
        let (priority, weight, port) = match &cf_record.data {
            Some(data) => (Some(data.priority), Some(data.weight), Some(data.port)),
            None => (cf_record.priority, None, None),
        };
        let value = cf_record.change_value().to_string();

        Ok(DnsRecord {
            id: cf_record.id,
            domain: domain.to_string(),
            name: full_name_to_relative(&cf_record.name, domain),
            record_type,
            value,
            ttl: cf_record.ttl,
            priority,
            weight,
            port,
        })
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    fn id(&self) -> &'static str {
        "cloudflare"
    }

    fn metadata() -> ProviderMetadata {
        ProviderMetadata {
            id: ProviderType::Cloudflare,
            name: "Cloudflare".to_string(),
            description: "Cloudflare DNS via the v4 REST API".to_string(),
            required_fields: vec![
                ProviderCredentialField {
                    key: "apiToken".to_string(),
                    label: "API Token".to_string(),
                    field_type: FieldType::Password,
                    env_var: Some("CLOUDFLARE_API_TOKEN".to_string()),
                    optional: false,
                },
                ProviderCredentialField {
                    key: "zoneId".to_string(),
                    label: "Zone ID".to_string(),
                    field_type: FieldType::Text,
                    env_var: Some("CLOUDFLARE_ZONE_ID".to_string()),
                    optional: true,
                },
            ],
        }
    }

    async fn validate_credentials(&self) -> Result<bool> {
        #[derive(Deserialize)]
        struct VerifyResponse {
            status: String,
        }

        match self
            .request::<VerifyResponse>(
                Method::GET,
                "/user/tokens/verify",
                None,
                RequestKind::Read,
                ErrorContext::default(),
            )
            .await
        {
            Ok(resp) => Ok(resp.status == "active"),
            Err(ProviderError::InvalidCredentials { .. } | ProviderError::PermissionDenied { .. }) => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn list_records(&self, domain: &str) -> Result<Vec<DnsRecord>> {
        let zone_id = self.resolve_zone_id(domain).await?;
        let context = ErrorContext {
            domain: Some(domain.to_string()),
            ..ErrorContext::default()
        };
        let records: Vec<CloudflareDnsRecord> = self
            .get_all_pages(
                &format!("/zones/{zone_id}/dns_records?order=name"),
                RECORDS_PAGE_SIZE,
                context,
            )
            .await?;

        records
            .into_iter()
            .map(|r| self.cf_record_to_dns_record(r, domain))
            .collect()
    }

    async fn get_record(&self, domain: &str, record_id: &str) -> Result<DnsRecord> {
        let zone_id = self.resolve_zone_id(domain).await?;
        let context = ErrorContext {
            record_id: Some(record_id.to_string()),
            domain: Some(domain.to_string()),
            ..ErrorContext::default()
        };
        let record: CloudflareDnsRecord = self
            .request(
                Method::GET,
                &format!("/zones/{zone_id}/dns_records/{record_id}"),
                None,
                RequestKind::Read,
                context,
            )
            .await?;
        self.cf_record_to_dns_record(record, domain)
    }

    async fn create_record(&self, change: &mut DnsChange) -> Result<()> {
        let zone_id = self.resolve_zone_id(&change.domain).await?;
        let body = RecordBody::from_change(change);

        let record: CloudflareDnsRecord = self
            .request(
                Method::POST,
                &format!("/zones/{zone_id}/dns_records"),
                Some(&body),
                RequestKind::Mutation,
                ErrorContext::for_change(change),
            )
            .await?;

        log::info!(
            "[cloudflare] Created {} -> {} (id {})",
            change.describe(),
            change.new_value,
            record.id
        );
        change.mark_applied(self.id(), record.id);
        Ok(())
    }

    async fn update_record(&self, change: &mut DnsChange) -> Result<()> {
        let zone_id = self.resolve_zone_id(&change.domain).await?;
        let record_id = if change.provider_record_id.is_empty() {
            self.find_record(&zone_id, change, &change.old_value)
                .await?
                .id
        } else {
            change.provider_record_id.clone()
        };

        let body = RecordBody::from_change(change);
        let mut context = ErrorContext::for_change(change);
        context.record_id = Some(record_id.clone());

        let record: CloudflareDnsRecord = self
            .request(
                Method::PUT,
                &format!("/zones/{zone_id}/dns_records/{record_id}"),
                Some(&body),
                RequestKind::Mutation,
                context,
            )
            .await?;

        log::info!(
            "[cloudflare] Updated {}: '{}' -> '{}'",
            change.describe(),
            change.old_value,
            change.new_value
        );
        change.mark_applied(self.id(), record.id);
        Ok(())
    }

    async fn delete_record(&self, domain: &str, record_id: &str) -> Result<()> {
        let zone_id = self.resolve_zone_id(domain).await?;
        let context = ErrorContext {
            record_id: Some(record_id.to_string()),
            domain: Some(domain.to_string()),
            ..ErrorContext::default()
        };

        #[derive(Deserialize)]
        struct Deleted {
            #[allow(dead_code)]
            id: String,
        }

        let _: Deleted = self
            .request(
                Method::DELETE,
                &format!("/zones/{zone_id}/dns_records/{record_id}"),
                None,
                RequestKind::Mutation,
                context,
            )
            .await?;
        log::info!("[cloudflare] Deleted record {record_id} in {domain}");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_zone_id_skips_lookup() {
        let provider = CloudflareProvider::new("token".to_string(), Some("zone-1".to_string()));
        assert_eq!(provider.resolve_zone_id("example.com").await.unwrap(), "zone-1");
    }

    #[tokio::test]
    async fn test_cached_zone_is_reused() {
        let provider = CloudflareProvider::new("token".to_string(), None);
        provider
            .zone_cache
            .write()
            .await
            .insert("example.com".to_string(), "zone-2".to_string());
        assert_eq!(provider.resolve_zone_id("Example.com.").await.unwrap(), "zone-2");
    }

    #[test]
    fn test_record_conversion_relative_name() {
        let provider = CloudflareProvider::new(String::new(), None);
        let json = r#"{"id":"r1","type":"A","name":"www.example.com","content":"1.2.3.4","ttl":300}"#;
        let cf: CloudflareDnsRecord = serde_json::from_str(json).unwrap();
        let record = provider.cf_record_to_dns_record(cf, "example.com").unwrap();
        assert_eq!(record.name, "www");
        assert_eq!(record.value, "1.2.3.4");
        assert_eq!(record.priority, None);
    }

    #[test]
    fn test_metadata_fields() {
        let meta = CloudflareProvider::metadata();
        assert_eq!(meta.id, ProviderType::Cloudflare);
        assert!(meta.required_fields.iter().any(|f| f.key == "apiToken" && !f.optional));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_invalid_token_is_rejected() {
        let provider = CloudflareProvider::new("invalid-token".to_string(), None);
        assert!(!provider.validate_credentials().await.unwrap());
    }
}
