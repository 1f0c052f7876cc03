//! Caching, retrying operation future
//!
//! One prepared operation call. Every result method runs the same pipeline:
//! 1. Merge per-call options (language, page) into a copy of the request
//! 2. Apply datasource and bearer token
//! 3. Serve an unexpired cached response when one exists
//! 4. Send, retrying 502/503/504 with exponential backoff
//! 5. Cache successful GET responses until their `Expires` time

use std::collections::BTreeMap;

use chrono::Utc;
use esi_core::{
    classify, expiry_from_headers, response_cache_key, time_to_expiry, CallOutcome, RetryPolicy,
};
use esi_core::request::retry::status_error;
use esi_domain::constants::{LANGUAGE_PARAM, PAGE_FETCH_CONCURRENCY, PAGE_PARAM};
use esi_domain::{
    CallOptions, EsiError, PreparedRequest, RawResponse, RequestConfig, Result,
};
use futures::{stream, StreamExt, TryStreamExt};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::handle::EsiClient;
use crate::spec::OperationSpec;

/// Accumulated pages of a `results` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedResults {
    /// Page payloads in page order; array pages are flattened.
    pub items: Vec<Value>,
    /// Last page's response when `also_return_response` is set.
    pub response: Option<RawResponse>,
}

/// Deferred call to one operation
#[derive(Clone)]
pub struct CachingRetryingFuture {
    client: EsiClient,
    operation: OperationSpec,
    request: PreparedRequest,
    pub request_config: RequestConfig,
}

impl std::fmt::Debug for CachingRetryingFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingRetryingFuture")
            .field("operation", &self.operation.operation_id)
            .field("method", &self.request.method)
            .field("url", &self.request.url)
            .field("request_config", &self.request_config)
            .finish()
    }
}

impl CachingRetryingFuture {
    pub(crate) fn new(
        client: EsiClient,
        operation: OperationSpec,
        request: PreparedRequest,
        request_config: RequestConfig,
    ) -> Self {
        Self { client, operation, request, request_config }
    }

    pub const fn operation(&self) -> &OperationSpec {
        &self.operation
    }

    /// The request as prepared from the call arguments, before per-call
    /// options and authentication are applied.
    pub const fn request(&self) -> &PreparedRequest {
        &self.request
    }

    #[must_use]
    pub fn also_return_response(mut self, enabled: bool) -> Self {
        self.request_config.also_return_response = enabled;
        self
    }

    /// Decoded payload of one call.
    ///
    /// # Errors
    /// Authentication failures, transport failures, non-retryable statuses
    /// and retryable statuses that outlast the retry budget.
    pub async fn result(&self, options: CallOptions) -> Result<Value> {
        self.execute(&options).await.map(|response| response.json())
    }

    /// Decoded payload together with the raw response.
    ///
    /// # Errors
    /// Same as [`Self::result`].
    pub async fn result_with_response(&self, options: CallOptions) -> Result<(Value, RawResponse)> {
        let response = self.execute(&options).await?;
        Ok((response.json(), response))
    }

    /// Every page of a paginated operation.
    ///
    /// The first page's `X-Pages` header decides how many more pages are
    /// fetched; pages are fetched concurrently but returned in page order.
    ///
    /// # Errors
    /// The first failing page's error.
    #[instrument(skip(self, options), fields(operation = %self.operation.operation_id))]
    pub async fn results(&self, options: CallOptions) -> Result<PagedResults> {
        let first = self.execute(&options).await?;
        let pages = first.pages().unwrap_or(1);
        debug!(pages, "Fetched first page");

        let mut items = Vec::new();
        push_page(&mut items, first.json());
        let mut last = first;

        if pages > 1 {
            let rest: Vec<RawResponse> = stream::iter(2..=pages)
                .map(|page| {
                    let options = options.clone().page(page);
                    async move { self.execute(&options).await }
                })
                .buffered(PAGE_FETCH_CONCURRENCY)
                .try_collect()
                .await?;
            for response in rest {
                push_page(&mut items, response.json());
                last = response;
            }
        }

        let response = self.request_config.also_return_response.then_some(last);
        Ok(PagedResults { items, response })
    }

    /// [`Self::results`] once per language.
    ///
    /// `None` uses every configured language. Languages are checked before
    /// any request is sent. Each language runs with a copy of `options`
    /// whose language is replaced.
    ///
    /// # Errors
    /// `EsiError::InvalidLanguage` for a language outside the configured
    /// set, otherwise the first failing language's error.
    pub async fn results_localized(
        &self,
        languages: Option<&[String]>,
        options: CallOptions,
    ) -> Result<BTreeMap<String, PagedResults>> {
        let configured = &self.client.settings().languages;
        let requested = languages.unwrap_or(configured.as_slice());

        let mut unique: Vec<String> = Vec::with_capacity(requested.len());
        for language in requested {
            if !self.client.settings().supports_language(language) {
                return Err(EsiError::InvalidLanguage(language.clone()));
            }
            if !unique.contains(language) {
                unique.push(language.clone());
            }
        }

        let results = futures::future::try_join_all(
            unique.iter().map(|language| self.results(options.clone().language(language.clone()))),
        )
        .await?;

        Ok(unique.into_iter().zip(results).collect())
    }

    /// Seconds until an HTTP-date; 0 when past or unparseable.
    pub fn time_to_expiry(expires: &str) -> u64 {
        time_to_expiry(expires, Utc::now())
    }

    /// Request for one call with the per-call options merged in.
    fn prepare(&self, options: &CallOptions) -> PreparedRequest {
        let mut request = self.request.clone();
        if let Some(language) = &options.language {
            request.params.insert(LANGUAGE_PARAM.to_string(), language.clone());
        }
        if let Some(page) = options.page {
            request.params.insert(PAGE_PARAM.to_string(), page.to_string());
        }
        request
    }

    async fn execute(&self, options: &CallOptions) -> Result<RawResponse> {
        let shared = &self.client.shared;
        let request = self.client.authenticator.apply(self.prepare(options)).await?;

        let cache_key = if request.is_get() {
            let principal = self.client.authenticator.principal().await;
            Some(response_cache_key(&request, principal.as_deref()))
        } else {
            None
        };
        if let Some(key) = &cache_key {
            if let Some(cached) = self.cached(key).await {
                return Ok(cached);
            }
        }

        let policy = RetryPolicy::from_settings(&shared.settings).with_override(options.retries);
        let timeout = options.timeout.unwrap_or_else(|| shared.settings.default_timeout());

        let mut retry_index = 0;
        let response = loop {
            let response = shared.transport.execute(&request, timeout).await?;
            match classify(response) {
                CallOutcome::Success(response) => break response,
                CallOutcome::Retryable(response) if retry_index < policy.max_retries => {
                    let delay = policy.delay_for(retry_index);
                    warn!(
                        operation = %self.operation.operation_id,
                        attempt = retry_index + 1,
                        status = response.status,
                        delay_secs = delay.as_secs_f64(),
                        "Retrying after server error"
                    );
                    shared.sleeper.sleep(delay).await;
                    retry_index += 1;
                }
                CallOutcome::Retryable(response) => return Err(status_error(response)),
                CallOutcome::Fatal(err) => return Err(err),
            }
        };

        if let Some(key) = &cache_key {
            self.store(key, &response).await;
        }
        Ok(response)
    }

    async fn cached(&self, key: &str) -> Option<RawResponse> {
        let shared = &self.client.shared;
        let body = match shared.cache.get(key).await {
            Ok(Some(body)) => body,
            Ok(None) => {
                debug!(key, "Response cache miss");
                return None;
            }
            Err(err) => {
                warn!(key, error = %err, "Response cache lookup failed");
                return None;
            }
        };
        let response: RawResponse = match serde_json::from_str(&body) {
            Ok(response) => response,
            Err(err) => {
                warn!(key, error = %err, "Discarding unreadable cached response");
                return None;
            }
        };
        if expiry_from_headers(&response, shared.clock.now()) == 0 {
            debug!(key, "Cached response expired");
            return None;
        }
        debug!(key, "Response cache hit");
        Some(response)
    }

    async fn store(&self, key: &str, response: &RawResponse) {
        let shared = &self.client.shared;
        let ttl = expiry_from_headers(response, shared.clock.now());
        if ttl == 0 {
            return;
        }
        let body = match serde_json::to_string(response) {
            Ok(body) => body,
            Err(err) => {
                warn!(key, error = %err, "Cannot serialize response for cache");
                return;
            }
        };
        if let Err(err) = shared.cache.set(key, body, std::time::Duration::from_secs(ttl)).await {
            warn!(key, error = %err, "Response cache write failed");
        }
    }
}

fn push_page(items: &mut Vec<Value>, page: Value) {
    match page {
        Value::Array(values) => items.extend(values),
        other => items.push(other),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn array_pages_are_flattened() {
        let mut items = Vec::new();
        push_page(&mut items, json!([1, 2]));
        push_page(&mut items, json!([3]));
        push_page(&mut items, json!({"solar_system_id": 30_000_142}));
        assert_eq!(items, vec![json!(1), json!(2), json!(3), json!({"solar_system_id": 30_000_142})]);
    }

    #[test]
    fn time_to_expiry_of_past_date_is_zero() {
        assert_eq!(CachingRetryingFuture::time_to_expiry("Thu, 01 Jan 2015 00:00:00 GMT"), 0);
        assert_eq!(CachingRetryingFuture::time_to_expiry("garbage"), 0);
    }
}
