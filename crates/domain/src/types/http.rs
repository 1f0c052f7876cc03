//! Transport-level request and response values

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{EXPIRES_HEADER, PAGES_HEADER};

/// A fully resolved HTTP request, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedRequest {
    pub method: String,
    pub url: String,
    pub params: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    /// Value of the `Authorization` header; `None` sends no header.
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

impl PreparedRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            url: url.into(),
            params: BTreeMap::new(),
            headers: BTreeMap::new(),
            authorization: None,
            body: None,
        }
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }
}

/// A response as received from the wire.
///
/// Header names are compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, headers: BTreeMap::new(), body: body.into() }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    pub fn expires(&self) -> Option<&str> {
        self.header(EXPIRES_HEADER)
    }

    /// Page count advertised by `X-Pages`; `None` for unpaged responses.
    pub fn pages(&self) -> Option<u32> {
        self.header(PAGES_HEADER).and_then(|value| value.trim().parse().ok())
    }

    /// Decoded body. Empty bodies decode to null and non-JSON bodies are
    /// returned as a string value.
    pub fn json(&self) -> Value {
        if self.body.trim().is_empty() {
            return Value::Null;
        }
        serde_json::from_str(&self.body).unwrap_or_else(|_| Value::String(self.body.clone()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let response = RawResponse::new(200, "[]").with_header("X-Pages", "3");
        assert_eq!(response.header("x-pages"), Some("3"));
        assert_eq!(response.header("X-PAGES"), Some("3"));
        assert_eq!(response.pages(), Some(3));
    }

    #[test]
    fn body_decoding() {
        assert_eq!(RawResponse::new(200, r#"{"players": 5}"#).json(), json!({"players": 5}));
        assert_eq!(RawResponse::new(204, "").json(), Value::Null);
        assert_eq!(RawResponse::new(200, "ok").json(), json!("ok"));
    }

    #[test]
    fn request_method_is_uppercased() {
        let request = PreparedRequest::new("get", "https://esi.evetech.net/latest/status/")
            .with_param("datasource", "tranquility");
        assert!(request.is_get());
        assert_eq!(request.param("datasource"), Some("tranquility"));
        assert!(request.authorization.is_none());
    }
}
