// ABOUTME: Timestamp encoding shared by every table
// ABOUTME: Fixed-width RFC 3339 text keeps lexical and chronological order aligned

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

/// Current time truncated to the stored precision
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Encode a timestamp for storage, e.g. `2025-03-01T08:30:00.000000Z`
pub fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}
