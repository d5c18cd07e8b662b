//! Operator instructions for manual mode.

use std::net::{IpAddr, Ipv4Addr};

use cutover_provider::describe_change;

use crate::types::{CutoverPlan, PropagationServer};

const FALLBACK_RESOLVER: IpAddr = IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8));

/// Instructions for applying, verifying and reverting every change by hand.
///
/// Verification hints query `resolver` (first configured nameserver), or a
/// public resolver when none is configured.
pub(crate) fn manual_instructions(
    plan: &CutoverPlan,
    resolver: Option<&PropagationServer>,
) -> Vec<String> {
    let resolver = resolver.map_or(FALLBACK_RESOLVER, |server| server.ip);
    let mut lines = Vec::with_capacity(plan.dns_changes.len() * 3 + 3);

    lines.push(format!(
        "Manual cutover for plan '{}': apply {} DNS change(s) at your DNS provider, in order:",
        plan.id,
        plan.dns_changes.len()
    ));
    for (i, change) in plan.dns_changes.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, describe_change(change)));
    }

    lines.push("Verify each change before sending traffic:".to_string());
    for change in &plan.dns_changes {
        lines.push(format!(
            "   dig +short {} {} @{resolver} should return {}",
            change.record_type,
            change.fqdn(),
            change.new_value
        ));
    }

    lines.push("To roll back, in this order:".to_string());
    for change in plan.dns_changes.iter().rev() {
        if change.old_value.is_empty() {
            lines.push(format!(
                "   Delete {} record {} (it did not exist before the cutover)",
                change.record_type,
                change.fqdn()
            ));
        } else {
            lines.push(format!("   Revert: {}", describe_change(&change.reverted())));
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DnsChange, DnsRecordType};

    fn plan() -> CutoverPlan {
        let mut plan = CutoverPlan::new("move-web", "bundle");
        plan.add_dns_change(
            DnsChange::new("web", "example.com", DnsRecordType::A, "www", "5.6.7.8")
                .with_old_value("1.2.3.4")
                .with_ttl(60),
        );
        plan.add_dns_change(DnsChange::new(
            "api",
            "example.com",
            DnsRecordType::Cname,
            "api",
            "lb.example.net",
        ));
        plan
    }

    #[test]
    fn test_one_line_per_change() {
        let lines = manual_instructions(&plan(), None);

        assert!(lines[0].contains("move-web"));
        assert_eq!(
            lines[1],
            "1. Update A record www.example.com: 1.2.3.4 -> 5.6.7.8 (TTL 60)"
        );
        assert_eq!(
            lines[2],
            "2. Create CNAME record api.example.com -> lb.example.net (TTL 300)"
        );
        assert!(lines.len() >= 2 + plan().dns_changes.len());
    }

    #[test]
    fn test_verification_uses_resolver() {
        let server = PropagationServer::new("Cloudflare", IpAddr::from([1, 1, 1, 1]));
        let lines = manual_instructions(&plan(), Some(&server));
        assert!(lines
            .iter()
            .any(|l| l.contains("dig +short A www.example.com @1.1.1.1 should return 5.6.7.8")));

        let lines = manual_instructions(&plan(), None);
        assert!(lines.iter().any(|l| l.contains("@8.8.8.8")));
    }

    #[test]
    fn test_revert_lines_in_reverse_order() {
        let lines = manual_instructions(&plan(), None);
        let tail = &lines[lines.len() - 2..];
        assert_eq!(
            tail[0],
            "   Delete CNAME record api.example.com (it did not exist before the cutover)"
        );
        assert_eq!(
            tail[1],
            "   Revert: Update A record www.example.com: 5.6.7.8 -> 1.2.3.4 (TTL 60)"
        );
    }
}
