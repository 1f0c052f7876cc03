//! HTTP transport port

use async_trait::async_trait;
use esi_domain::{PreparedRequest, RawResponse, RequestTimeout, Result};

/// Executes prepared requests.
///
/// Any status the server answers with is returned as `Ok`; only failures to
/// obtain a response (connection, timeout) are errors.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: &PreparedRequest, timeout: RequestTimeout)
        -> Result<RawResponse>;
}
