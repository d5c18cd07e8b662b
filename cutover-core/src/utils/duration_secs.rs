//! `Duration` serialization/deserialization helpers.
//!
//! - Serialization: `Duration` -> seconds (an integer when whole, a float otherwise)
//! - Deserialization: seconds (integer or float) or a string such as `"90"`,
//!   `"30s"`, `"5m"`, `"1h"`

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// Serializes a `Duration` as seconds, keeping sub-second precision.
pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if duration.subsec_nanos() == 0 {
        serializer.serialize_u64(duration.as_secs())
    } else {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}

/// Deserializes a `Duration` from seconds or a suffixed string.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SecondsOrString {
        U64(u64),
        F64(f64),
        String(String),
    }

    match SecondsOrString::deserialize(deserializer)? {
        SecondsOrString::U64(secs) => Ok(Duration::from_secs(secs)),
        SecondsOrString::F64(secs) => Duration::try_from_secs_f64(secs)
            .map_err(|e| Error::custom(format!("Invalid duration {secs}: {e}"))),
        SecondsOrString::String(s) => {
            parse_duration(&s).ok_or_else(|| Error::custom(format!("Invalid duration: {s:?}")))
        }
    }
}

/// Parses `"<n>"`, `"<n>s"`, `"<n>m"` or `"<n>h"`.
fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let (digits, unit) = match s.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((idx, _)) => s.split_at(idx),
        None => (s, ""),
    };
    let value: u64 = digits.parse().ok()?;
    let multiplier = match unit.trim() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        _ => return None,
    };
    value.checked_mul(multiplier).map(Duration::from_secs)
}
