//! Resolver construction for nameserver-targeted lookups.

use std::net::IpAddr;
use std::time::Duration;

use hickory_resolver::{
    config::{NameServerConfigGroup, ResolverConfig, ResolverOpts},
    name_server::TokioConnectionProvider,
    TokioResolver,
};

/// Build a resolver that only talks to `ns_ip` over plain UDP/TCP port 53.
///
/// A fresh resolver is built per lookup so consecutive propagation rounds
/// never answer from a cache.
pub(crate) fn build_resolver_for_ns(ns_ip: IpAddr, query_timeout: Duration) -> TokioResolver {
    let config = ResolverConfig::from_parts(
        None,
        vec![],
        NameServerConfigGroup::from_ips_clear(&[ns_ip], 53, true),
    );
    let provider = TokioConnectionProvider::default();
    let mut opts = ResolverOpts::default();
    opts.timeout = query_timeout;
    opts.attempts = 1;
    TokioResolver::builder_with_config(config, provider)
        .with_options(opts)
        .build()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_build_resolver_for_ns_v4() {
        let ip: IpAddr = "8.8.8.8".parse().unwrap();
        let _resolver = build_resolver_for_ns(ip, Duration::from_secs(2));
    }

    #[test]
    fn test_build_resolver_for_ns_v6() {
        let ip: IpAddr = "2606:4700:4700::1111".parse().unwrap();
        let _resolver = build_resolver_for_ns(ip, Duration::from_secs(2));
    }
}
