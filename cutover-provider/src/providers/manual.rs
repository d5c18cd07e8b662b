//! Manual provider: describes DNS changes for an operator instead of applying them.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ProviderError, Result};
use crate::traits::DnsProvider;
use crate::types::{DnsChange, DnsRecord, ProviderMetadata, ProviderType};

/// Provider that never touches live DNS.
///
/// Every mutation is logged as an instruction and kept in an in-memory
/// journal, then reported as successful.
#[derive(Debug, Default)]
pub struct ManualProvider {
    journal: Mutex<Vec<String>>,
}

impl ManualProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instructions issued so far, oldest first.
    pub fn instructions(&self) -> Vec<String> {
        self.journal
            .lock()
            .map(|journal| journal.clone())
            .unwrap_or_default()
    }

    fn record(&self, instruction: String) {
        log::info!("[manual] {instruction}");
        if let Ok(mut journal) = self.journal.lock() {
            journal.push(instruction);
        }
    }
}

/// One-line operator instruction for a change.
pub fn describe_change(change: &DnsChange) -> String {
    let extra = match (change.priority, change.weight, change.port) {
        (Some(p), Some(w), Some(port)) => format!(" (priority {p}, weight {w}, port {port})"),
        (Some(p), _, _) => format!(" (priority {p})"),
        _ => String::new(),
    };
    if change.old_value.is_empty() {
        format!(
            "Create {} record {} -> {}{extra} (TTL {})",
            change.record_type,
            change.fqdn(),
            change.new_value,
            change.ttl
        )
    } else {
        format!(
            "Update {} record {}: {} -> {}{extra} (TTL {})",
            change.record_type,
            change.fqdn(),
            change.old_value,
            change.new_value,
            change.ttl
        )
    }
}

#[async_trait]
impl DnsProvider for ManualProvider {
    fn id(&self) -> &'static str {
        "manual"
    }

    fn metadata() -> ProviderMetadata {
        ProviderMetadata {
            id: ProviderType::Manual,
            name: "Manual".to_string(),
            description: "Prints the DNS changes for an operator to apply by hand".to_string(),
            required_fields: Vec::new(),
        }
    }

    fn applies_changes(&self) -> bool {
        false
    }

    async fn validate_credentials(&self) -> Result<bool> {
        Ok(true)
    }

    async fn list_records(&self, _domain: &str) -> Result<Vec<DnsRecord>> {
        Ok(Vec::new())
    }

    async fn get_record(&self, _domain: &str, record_id: &str) -> Result<DnsRecord> {
        Err(ProviderError::RecordNotFound {
            provider: self.id().to_string(),
            record_id: record_id.to_string(),
            raw_message: Some("the manual provider does not track records".to_string()),
        })
    }

    async fn create_record(&self, change: &mut DnsChange) -> Result<()> {
        self.record(describe_change(change));
        change.mark_applied(self.id(), format!("manual-{}", change.id));
        Ok(())
    }

    async fn update_record(&self, change: &mut DnsChange) -> Result<()> {
        self.record(describe_change(change));
        change.mark_applied(self.id(), format!("manual-{}", change.id));
        Ok(())
    }

    async fn delete_record(&self, domain: &str, record_id: &str) -> Result<()> {
        self.record(format!("Delete record {record_id} in {domain}"));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{DnsChangeStatus, DnsRecordType};

    #[tokio::test]
    async fn test_update_is_journaled_and_applied() {
        let provider = ManualProvider::new();
        let mut change = DnsChange::new("c1", "example.com", DnsRecordType::A, "@", "5.6.7.8")
            .with_old_value("1.2.3.4");

        provider.update_record(&mut change).await.unwrap();

        assert_eq!(change.status, DnsChangeStatus::Applied);
        assert_eq!(change.provider, "manual");
        let journal = provider.instructions();
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0], "Update A record example.com: 1.2.3.4 -> 5.6.7.8 (TTL 300)");
    }

    #[tokio::test]
    async fn test_create_mentions_priority() {
        let provider = ManualProvider::new();
        let mut change = DnsChange::new("mx", "example.com", DnsRecordType::Mx, "@", "mx.example.com")
            .with_priority(10)
            .with_ttl(600);
        provider.create_record(&mut change).await.unwrap();
        assert_eq!(
            provider.instructions()[0],
            "Create MX record example.com -> mx.example.com (priority 10) (TTL 600)"
        );
    }

    #[tokio::test]
    async fn test_reads_are_empty() {
        let provider = ManualProvider::new();
        assert!(!provider.applies_changes());
        assert!(provider.validate_credentials().await.unwrap());
        assert!(provider.list_records("example.com").await.unwrap().is_empty());
        assert!(matches!(
            provider.get_record("example.com", "x").await,
            Err(ProviderError::RecordNotFound { .. })
        ));
    }
}
