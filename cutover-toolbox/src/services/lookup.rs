//! Record lookups against a single nameserver.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::proto::rr::{RData, RecordType};

use crate::error::{ToolboxError, ToolboxResult};
use crate::types::DnsQueryType;

use super::resolver::build_resolver_for_ns;

/// Resolves the values of one record type at one nameserver.
///
/// An empty answer (NXDOMAIN, NODATA) is `Ok(vec![])`; only transport or
/// server failures are errors.
#[async_trait]
pub trait RecordLookup: Send + Sync {
    async fn lookup(
        &self,
        nameserver: IpAddr,
        domain: &str,
        record_type: DnsQueryType,
    ) -> ToolboxResult<Vec<String>>;
}

/// [`RecordLookup`] backed by a hickory resolver pinned to the nameserver.
#[derive(Debug, Clone)]
pub struct HickoryRecordLookup {
    query_timeout: Duration,
}

impl HickoryRecordLookup {
    pub fn new(query_timeout: Duration) -> Self {
        Self { query_timeout }
    }
}

impl Default for HickoryRecordLookup {
    fn default() -> Self {
        Self::new(Duration::from_secs(super::propagation::QUERY_TIMEOUT_SECS))
    }
}

#[async_trait]
impl RecordLookup for HickoryRecordLookup {
    async fn lookup(
        &self,
        nameserver: IpAddr,
        domain: &str,
        record_type: DnsQueryType,
    ) -> ToolboxResult<Vec<String>> {
        let resolver = build_resolver_for_ns(nameserver, self.query_timeout);
        match resolver.lookup(domain, to_record_type(record_type)).await {
            Ok(response) => Ok(response
                .record_iter()
                .filter(|record| record.record_type() == to_record_type(record_type))
                .filter_map(|record| rdata_value(record_type, record.data()))
                .collect()),
            Err(e) if e.is_no_records_found() || e.is_nx_domain() => {
                log::debug!("[DNS] {nameserver}: no {record_type} records for {domain}");
                Ok(Vec::new())
            }
            Err(e) => Err(ToolboxError::LookupError(format!(
                "{record_type} {domain} @{nameserver}: {e}"
            ))),
        }
    }
}

fn to_record_type(record_type: DnsQueryType) -> RecordType {
    match record_type {
        DnsQueryType::A => RecordType::A,
        DnsQueryType::Aaaa => RecordType::AAAA,
        DnsQueryType::Cname => RecordType::CNAME,
        DnsQueryType::Mx => RecordType::MX,
        DnsQueryType::Txt => RecordType::TXT,
        DnsQueryType::Ns => RecordType::NS,
        DnsQueryType::Srv => RecordType::SRV,
        DnsQueryType::Caa => RecordType::CAA,
        DnsQueryType::Ptr => RecordType::PTR,
    }
}

/// Render the comparable part of an answer.
///
/// MX and SRV yield only the target host; their numeric fields are not part of
/// a change's value. Domain names lose the trailing dot.
fn rdata_value(record_type: DnsQueryType, data: &RData) -> Option<String> {
    let host = |name: String| name.trim_end_matches('.').to_string();
    match record_type {
        DnsQueryType::A => data.as_a().map(ToString::to_string),
        DnsQueryType::Aaaa => data.as_aaaa().map(ToString::to_string),
        DnsQueryType::Cname => data.as_cname().map(|c| host(c.0.to_string())),
        DnsQueryType::Mx => data.as_mx().map(|mx| host(mx.exchange().to_string())),
        DnsQueryType::Ns => data.as_ns().map(|ns| host(ns.0.to_string())),
        DnsQueryType::Ptr => data.as_ptr().map(|ptr| host(ptr.0.to_string())),
        DnsQueryType::Srv => data.as_srv().map(|srv| host(srv.target().to_string())),
        DnsQueryType::Txt => data.as_txt().map(|txt| {
            txt.iter()
                .map(|chunk| String::from_utf8_lossy(chunk).to_string())
                .collect::<String>()
        }),
        DnsQueryType::Caa => data.as_caa().map(|caa| {
            format!(
                "{} {} \"{}\"",
                if caa.issuer_critical() { 128 } else { 0 },
                caa.tag().as_str(),
                String::from_utf8_lossy(caa.raw_value())
            )
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use hickory_resolver::proto::rr::rdata::{A, CNAME, MX, TXT};
    use hickory_resolver::proto::rr::Name;

    #[test]
    fn test_rdata_value_strips_trailing_dot() {
        let name = Name::from_ascii("lb.example.net.").unwrap();
        let data = RData::CNAME(CNAME(name.clone()));
        assert_eq!(
            rdata_value(DnsQueryType::Cname, &data).as_deref(),
            Some("lb.example.net")
        );

        let mx = RData::MX(MX::new(10, name));
        assert_eq!(
            rdata_value(DnsQueryType::Mx, &mx).as_deref(),
            Some("lb.example.net")
        );
    }

    #[test]
    fn test_rdata_value_a_and_txt() {
        let a = RData::A(A::new(203, 0, 113, 7));
        assert_eq!(rdata_value(DnsQueryType::A, &a).as_deref(), Some("203.0.113.7"));

        let txt = RData::TXT(TXT::new(vec!["v=spf1 ".to_string(), "-all".to_string()]));
        assert_eq!(
            rdata_value(DnsQueryType::Txt, &txt).as_deref(),
            Some("v=spf1 -all")
        );
    }

    #[test]
    fn test_rdata_value_type_mismatch_is_none() {
        let a = RData::A(A::new(203, 0, 113, 7));
        assert!(rdata_value(DnsQueryType::Cname, &a).is_none());
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_hickory_lookup_real() {
        let lookup = HickoryRecordLookup::default();
        let answers = lookup
            .lookup("8.8.8.8".parse().unwrap(), "google.com", DnsQueryType::A)
            .await
            .unwrap();
        assert!(!answers.is_empty());
    }
}
