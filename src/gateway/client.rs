use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::UpstreamConfig;
use crate::error::{Error, Result};

/// Seam between the filter pipeline and the wire. Implemented by the real
/// [`GraphQlClient`] and by fakes in tests.
#[async_trait]
pub trait GraphQlTransport: Send + Sync {
    /// Execute one GraphQL round trip and return the unwrapped `data`
    /// payload.
    async fn send(&self, query: &str, variables: Value) -> Result<Value>;
}

/// HTTP client for the headless-CMS GraphQL endpoint.
///
/// One round trip per invocation; no caching, no retries. Transport
/// failures and application-level GraphQL errors surface as distinct
/// [`Error`] variants.
pub struct GraphQlClient {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<Value>>,
}

impl GraphQlClient {
    /// Build a client from the upstream configuration. Fails fast with
    /// [`Error::Configuration`] when the endpoint or token is absent, so
    /// callers can distinguish "not configured" from "request failed".
    pub fn new(upstream: Option<&UpstreamConfig>) -> Result<Self> {
        let upstream = upstream.ok_or(Error::Configuration)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: upstream.endpoint.clone(),
            token: upstream.token.clone(),
        })
    }
}

#[async_trait]
impl GraphQlTransport for GraphQlClient {
    async fn send(&self, query: &str, variables: Value) -> Result<Value> {
        let variables = if variables.is_null() {
            json!({})
        } else {
            variables
        };

        debug!(endpoint = %self.endpoint, "Sending GraphQL request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            warn!(status = status.as_u16(), "GraphQL request failed");
            return Err(Error::Transport {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Envelope = response.json().await?;

        if let Some(errors) = envelope.errors.filter(|e| !e.is_empty()) {
            warn!(count = errors.len(), "Upstream returned GraphQL errors");
            return Err(Error::Upstream { errors });
        }

        Ok(envelope.data.unwrap_or(Value::Null))
    }
}
