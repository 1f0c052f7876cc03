//! `Expires` header parsing

use chrono::{DateTime, NaiveDateTime, Utc};
use esi_domain::RawResponse;

// Obsolete HTTP-date forms still accepted by RFC 9110.
const FALLBACK_FORMATS: &[&str] =
    &["%a, %d %b %Y %H:%M:%S GMT", "%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"];

/// Parse an HTTP-date.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    FALLBACK_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

/// Whole seconds from `now` until the `Expires` value.
///
/// Past dates and unparseable values yield 0.
pub fn time_to_expiry(expires: &str, now: DateTime<Utc>) -> u64 {
    parse_http_date(expires)
        .map(|at| (at - now).num_seconds())
        .and_then(|secs| u64::try_from(secs).ok())
        .unwrap_or(0)
}

/// [`time_to_expiry`] for a response; 0 when it has no `Expires` header.
pub fn expiry_from_headers(response: &RawResponse, now: DateTime<Utc>) -> u64 {
    response.expires().map_or(0, |expires| time_to_expiry(expires, now))
}
