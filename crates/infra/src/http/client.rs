use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use esi_core::HttpTransport;
use esi_domain::{EsiError, PreparedRequest, RawResponse, RequestTimeout, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client as ReqwestClient, Method};
use tracing::debug;

use crate::errors::InfraError;

/// reqwest-backed [`HttpTransport`].
///
/// reqwest fixes the connect timeout per client, so one pooled client is kept
/// for every connect timeout seen. Retries are not handled here; the caching
/// future owns the retry loop.
#[derive(Clone)]
pub struct ReqwestTransport {
    clients: Arc<DashMap<Duration, ReqwestClient>>,
    user_agent: Option<String>,
}

impl ReqwestTransport {
    /// Start building a new transport.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Client whose connect timeout is `connect`, built on first use.
    fn client_for(&self, connect: Duration) -> Result<ReqwestClient> {
        if let Some(client) = self.clients.get(&connect) {
            return Ok(client.value().clone());
        }
        let client = build_client(connect, self.user_agent.as_deref())?;
        debug!(connect_secs = connect.as_secs_f64(), "Built HTTP client for connect timeout");
        Ok(self.clients.entry(connect).or_insert(client).value().clone())
    }

    fn map_send_error(err: reqwest::Error, timeout: RequestTimeout) -> EsiError {
        if err.is_connect() && err.is_timeout() {
            return EsiError::Timeout(timeout.connect());
        }
        if err.is_timeout() {
            return EsiError::Timeout(timeout.read());
        }
        InfraError::from(err).into()
    }
}

fn build_client(connect: Duration, user_agent: Option<&str>) -> Result<ReqwestClient> {
    let mut builder = ReqwestClient::builder().connect_timeout(connect).no_proxy();
    if let Some(agent) = user_agent {
        builder = builder.user_agent(agent);
    }
    builder
        .build()
        .map_err(|err| EsiError::ClientConstruction(format!("cannot build HTTP client: {err}")))
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(
        &self,
        request: &PreparedRequest,
        timeout: RequestTimeout,
    ) -> Result<RawResponse> {
        let method = Method::from_bytes(request.method.as_bytes()).map_err(|_| {
            EsiError::InvalidParameter(format!("unsupported HTTP method '{}'", request.method))
        })?;

        let mut builder = self
            .client_for(timeout.connect())?
            .request(method.clone(), &request.url)
            .query(&request.params)
            .timeout(timeout.read());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(authorization) = &request.authorization {
            builder = builder.header(AUTHORIZATION, authorization.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(%method, url = %request.url, "sending HTTP request");

        let response = tokio::time::timeout(timeout.total(), builder.send())
            .await
            .map_err(|_| EsiError::Timeout(timeout.total()))?
            .map_err(|err| Self::map_send_error(err, timeout))?;

        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(|err| Self::map_send_error(err, timeout))?;

        debug!(%method, url = %request.url, status, "received HTTP response");
        Ok(RawResponse { status, headers, body })
    }
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug)]
pub struct ReqwestTransportBuilder {
    connect_timeout: Duration,
    user_agent: Option<String>,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self { connect_timeout: Duration::from_secs(5), user_agent: None }
    }
}

impl ReqwestTransportBuilder {
    /// Connect timeout of the client built up front.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<ReqwestTransport> {
        let client = build_client(self.connect_timeout, self.user_agent.as_deref())?;
        let clients = DashMap::new();
        clients.insert(self.connect_timeout, client);
        Ok(ReqwestTransport { clients: Arc::new(clients), user_agent: self.user_agent })
    }
}
