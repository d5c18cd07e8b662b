//! DNS propagation wait.

use futures::future::join_all;
use log::{debug, info};
use tokio::time::{sleep, timeout, Duration, Instant};

use crate::types::{
    NameserverResult, PropagationOptions, PropagationOutcome, PropagationQuery,
    PropagationServer, PropagationStatus,
};

use super::lookup::RecordLookup;

/// DNS query timeout in seconds.
pub(crate) const QUERY_TIMEOUT_SECS: u64 = 5;

/// Compare an answer with the expected value, ignoring case, quotes and a trailing dot.
pub(crate) fn values_match(expected: &str, actual: &str) -> bool {
    fn normalize(value: &str) -> String {
        value
            .trim()
            .trim_matches('"')
            .trim_end_matches('.')
            .to_lowercase()
    }
    normalize(expected) == normalize(actual)
}

/// Poll the nameservers until the quorum returns the expected value or the
/// shared deadline passes.
pub(crate) async fn wait_for_propagation(
    lookup: &dyn RecordLookup,
    query: &PropagationQuery,
    options: &PropagationOptions,
) -> PropagationOutcome {
    let start = Instant::now();
    let deadline = start + options.timeout;
    let required = options.quorum.required(options.nameservers.len());
    let mut rounds = 0;
    let mut results = Vec::new();
    let mut propagated = false;

    if required == 0 {
        log::warn!("[Propagation] No nameservers configured, nothing to check");
    } else {
        loop {
            rounds += 1;
            results = query_round(lookup, query, &options.nameservers, deadline).await;
            let matched = results
                .iter()
                .filter(|r| r.status == PropagationStatus::Matched)
                .count();
            debug!(
                "[Propagation] {} {} round {rounds}: {matched}/{} matched",
                query.record_type,
                query.domain,
                results.len()
            );

            if matched >= required {
                propagated = true;
                break;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            sleep(options.interval.min(remaining)).await;
            if Instant::now() >= deadline {
                break;
            }
        }
    }

    // u128 -> u64: elapsed millis for a propagation wait will never exceed u64::MAX
    #[allow(clippy::cast_possible_truncation)]
    let elapsed_ms = start.elapsed().as_millis() as u64;
    info!(
        "[Propagation] {} {} -> {}: propagated={propagated} after {rounds} round(s), {elapsed_ms}ms",
        query.record_type, query.domain, query.expected_value
    );

    PropagationOutcome {
        propagated,
        rounds,
        results,
        elapsed_ms,
    }
}

/// Query every nameserver concurrently; returns once all have answered or timed out.
async fn query_round(
    lookup: &dyn RecordLookup,
    query: &PropagationQuery,
    servers: &[PropagationServer],
    deadline: Instant,
) -> Vec<NameserverResult> {
    let budget = Duration::from_secs(QUERY_TIMEOUT_SECS)
        .min(deadline.saturating_duration_since(Instant::now()));

    let futures: Vec<_> = servers
        .iter()
        .map(|server| async move {
            let query_start = Instant::now();
            let result = timeout(
                budget,
                lookup.lookup(server.ip, &query.domain, query.record_type),
            )
            .await;
            // u128 -> u64: elapsed millis for a DNS query will never exceed u64::MAX
            #[allow(clippy::cast_possible_truncation)]
            let elapsed = query_start.elapsed().as_millis() as u64;

            match result {
                Ok(Ok(answers)) => {
                    let status = if answers
                        .iter()
                        .any(|answer| values_match(&query.expected_value, answer))
                    {
                        PropagationStatus::Matched
                    } else {
                        PropagationStatus::Mismatch
                    };
                    NameserverResult {
                        server: server.clone(),
                        status,
                        answers,
                        error: None,
                        response_time_ms: elapsed,
                    }
                }
                Ok(Err(e)) => NameserverResult {
                    server: server.clone(),
                    status: PropagationStatus::Error,
                    answers: vec![],
                    error: Some(e.to_string()),
                    response_time_ms: elapsed,
                },
                Err(_) => NameserverResult {
                    server: server.clone(),
                    status: PropagationStatus::Timeout,
                    answers: vec![],
                    error: Some(format!("Query timeout ({}ms)", budget.as_millis())),
                    response_time_ms: elapsed,
                },
            }
        })
        .collect();

    join_all(futures).await
}
