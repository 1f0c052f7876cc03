//! Shared fixtures for the client integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use esi_core::testing::RecordingSleeper;
use esi_core::{CacheBackend, CredentialLifecycle, HttpTransport};
use esi_domain::{
    Credential, EsiError, EsiSettings, PreparedRequest, RawResponse, RequestTimeout, Result,
};
use esi_infra::{EsiClientFactory, ReqwestTransport};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Swagger document whose operations point back at `server`.
pub fn swagger(server: &MockServer, base_path: &str) -> Value {
    json!({
        "swagger": "2.0",
        "info": {"title": "EVE Swagger Interface", "version": "1.0"},
        "host": server.address().to_string(),
        "basePath": base_path,
        "schemes": ["http"],
        "paths": {
            "/status/": {
                "get": {
                    "operationId": "get_status",
                    "tags": ["Status"],
                    "parameters": [{"$ref": "#/parameters/datasource"}],
                    "responses": {"200": {"description": "ok", "schema": {"$ref": "#/definitions/status"}}}
                }
            },
            "/contracts/public/{region_id}/": {
                "get": {
                    "operationId": "get_contracts_public_region_id",
                    "tags": ["Contracts"],
                    "parameters": [
                        {"$ref": "#/parameters/datasource"},
                        {"$ref": "#/parameters/page"},
                        {"name": "region_id", "in": "path", "required": true, "type": "integer"}
                    ],
                    "responses": {"200": {"description": "ok"}}
                }
            },
            "/universe/types/{type_id}/": {
                "get": {
                    "operationId": "get_universe_types_type_id",
                    "tags": ["Universe"],
                    "parameters": [
                        {"$ref": "#/parameters/datasource"},
                        {"$ref": "#/parameters/language"},
                        {"name": "type_id", "in": "path", "required": true, "type": "integer"}
                    ],
                    "responses": {"200": {"description": "ok"}}
                }
            },
            "/markets/groups/{market_group_id}/": {
                "get": {
                    "operationId": "get_markets_groups_market_group_id",
                    "tags": ["Market"],
                    "parameters": [
                        {"$ref": "#/parameters/datasource"},
                        {"name": "Accept-Language", "in": "header", "type": "string"},
                        {"name": "market_group_id", "in": "path", "required": true, "type": "integer"}
                    ],
                    "responses": {"200": {"description": "ok"}}
                }
            },
            "/characters/{character_id}/assets/": {
                "get": {
                    "operationId": "get_characters_character_id_assets",
                    "tags": ["Assets"],
                    "parameters": [
                        {"$ref": "#/parameters/datasource"},
                        {"name": "character_id", "in": "path", "required": true, "type": "integer"}
                    ],
                    "responses": {"200": {"description": "ok"}}
                }
            }
        },
        "parameters": {
            "datasource": {"name": "datasource", "in": "query", "type": "string"},
            "page": {"name": "page", "in": "query", "type": "integer"},
            "language": {"name": "language", "in": "query", "type": "string"}
        },
        "definitions": {
            "status": {"type": "object", "properties": {"players": {"type": "integer"}}},
            "unused": {"type": "string"}
        }
    })
}

/// Serve `swagger(server, "/{version}")` at `/{version}/swagger.json`.
pub async fn serve_spec(server: &MockServer, version: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/{version}/swagger.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(swagger(server, &format!("/{version}"))))
        .mount(server)
        .await;
}

pub fn settings(server: &MockServer) -> EsiSettings {
    EsiSettings { api_url: server.uri(), ..EsiSettings::default() }
}

/// Route test logs through the test writer; `RUST_LOG` overrides `warn`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Factory with a recording sleeper so retries never wait.
pub fn factory(settings: EsiSettings) -> (EsiClientFactory, RecordingSleeper) {
    init_tracing();
    let sleeper = RecordingSleeper::new();
    let factory = EsiClientFactory::new(settings)
        .expect("factory should build")
        .with_sleeper(Arc::new(sleeper.clone()));
    (factory, sleeper)
}

/// HTTP-date `secs` seconds from now (negative for the past).
pub fn http_date_in(secs: i64) -> String {
    (Utc::now() + chrono::Duration::seconds(secs)).format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

pub fn params(entries: &[(&str, Value)]) -> esi_infra::Params {
    entries.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
}

/// Real transport that remembers the timeout of every request.
pub struct RecordingTransport {
    inner: ReqwestTransport,
    timeouts: Mutex<Vec<RequestTimeout>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            inner: ReqwestTransport::new().expect("transport should build"),
            timeouts: Mutex::new(Vec::new()),
        }
    }

    pub fn timeouts(&self) -> Vec<RequestTimeout> {
        self.timeouts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn execute(&self, request: &PreparedRequest, timeout: RequestTimeout) -> Result<RawResponse> {
        self.timeouts.lock().unwrap_or_else(PoisonError::into_inner).push(timeout);
        self.inner.execute(request, timeout).await
    }
}

/// Cache whose every operation fails.
pub struct FailingCache;

#[async_trait]
impl CacheBackend for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(EsiError::Cache("backend unavailable".into()))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: std::time::Duration) -> Result<()> {
        Err(EsiError::Cache("backend unavailable".into()))
    }
}

/// Lifecycle that hands out a fixed token and counts refreshes.
#[derive(Default)]
pub struct StaticLifecycle {
    pub refreshes: AtomicUsize,
}

impl StaticLifecycle {
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialLifecycle for StaticLifecycle {
    async fn refresh(&self, credential: &mut Credential) -> Result<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        credential.access_token = "refreshed".to_string();
        credential.created = Utc::now();
        Ok(())
    }

    async fn discard(&self, _credential: &Credential) -> Result<()> {
        Ok(())
    }

    fn valid_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(1200)
    }
}
