//! Cache key derivation

use std::collections::BTreeMap;

use esi_domain::constants::{RESPONSE_CACHE_PREFIX, SPEC_CACHE_PREFIX, USER_AGENT_HEADER};
use esi_domain::PreparedRequest;
use serde_json::json;
use sha2::{Digest, Sha256};

/// Cache entry name for a Swagger document: `esi_swaggerspec_<name>`.
///
/// Resolvers pass the document URL as `name`, so documents from different
/// API hosts never share an entry.
pub fn spec_cache_name(name: &str) -> String {
    format!("{SPEC_CACHE_PREFIX}{name}")
}

/// Deterministic key for a response.
///
/// Covers method, URL, every query parameter (datasource and language
/// included), header parameters, the body and the principal the request is
/// made for. The access token and `User-Agent` are excluded so a refresh or
/// a new app string does not invalidate entries.
pub fn response_cache_key(request: &PreparedRequest, principal: Option<&str>) -> String {
    let headers: BTreeMap<String, &str> = request
        .headers
        .iter()
        .filter(|(name, _)| {
            !name.eq_ignore_ascii_case(USER_AGENT_HEADER) && !name.eq_ignore_ascii_case("authorization")
        })
        .map(|(name, value)| (name.to_ascii_lowercase(), value.as_str()))
        .collect();
    let canonical = json!({
        "method": request.method,
        "url": request.url,
        "params": request.params,
        "headers": headers,
        "body": request.body,
        "principal": principal,
    });
    let digest = Sha256::digest(canonical.to_string().as_bytes());
    format!("{RESPONSE_CACHE_PREFIX}{}", hex::encode(digest))
}
