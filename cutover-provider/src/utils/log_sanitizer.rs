//! Log sanitization utilities
//!
//! Keeps API response bodies and credentials out of debug/error logs.

/// Maximum number of characters to include in truncated log output.
const TRUNCATE_LIMIT: usize = 256;

/// MSRV-compatible replacement for `str::floor_char_boundary` (stable since 1.91.0).
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        s.len()
    } else {
        let mut i = index;
        while i > 0 && !s.is_char_boundary(i) {
            i -= 1;
        }
        i
    }
}

/// Truncate a string for safe logging.
///
/// Returns the original string if it's within the limit,
/// otherwise returns the first `TRUNCATE_LIMIT` characters with a suffix
/// indicating the total length.
pub fn truncate_for_log(s: &str) -> String {
    if s.len() <= TRUNCATE_LIMIT {
        s.to_string()
    } else {
        format!(
            "{}... [truncated, total {} bytes]",
            &s[..floor_char_boundary(s, TRUNCATE_LIMIT)],
            s.len()
        )
    }
}

/// Number of leading characters of a secret kept by [`redact`].
const REDACT_KEEP: usize = 4;

/// Mask a secret for logging, keeping only a short prefix.
///
/// `"AKIDEXAMPLE"` becomes `"AKID****"`; short values are masked entirely.
pub fn redact(secret: &str) -> String {
    if secret.chars().count() <= REDACT_KEEP * 2 {
        "****".to_string()
    } else {
        let prefix: String = secret.chars().take(REDACT_KEEP).collect();
        format!("{prefix}****")
    }
}
