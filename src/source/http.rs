//! HTTP resource client for the biomonitor server's REST API.
//!
//! Resources map onto URL paths below the endpoint:
//!
//! - `get_static("status")` → `GET {endpoint}/status`
//! - `get("session", id)` → `GET {endpoint}/session/{id}`
//! - `create("sessions", body)` → `POST {endpoint}/sessions`
//! - `update("session", id, body)` → `POST {endpoint}/session/{id}`
//! - `delete("annotation", id)` → `DELETE {endpoint}/annotation/{id}`
//! - `get_nested("session", id, "stream", q)` → `GET {endpoint}/session/{id}/stream?…`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::debug;

use super::{ClientError, Query, ResourceClient};

/// Default server address; the biomonitor server listens on port 1492.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:1492";

/// Resource client backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    endpoint: String,
    description: String,
}

impl HttpClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// The base URL requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.endpoint.clone();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoded(segment));
        }
        url
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<Value, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        debug!(%url, %status, "biomonitor response");

        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(url.to_string()));
        }

        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        // Deletes and commands may answer with an empty body.
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ResourceClient for HttpClient {
    async fn get_static(&self, resource: &str) -> Result<Value, ClientError> {
        let url = self.url(&[resource]);
        self.send(self.client.get(&url), &url).await
    }

    async fn get(&self, resource: &str, id: &str) -> Result<Value, ClientError> {
        let url = self.url(&[resource, id]);
        self.send(self.client.get(&url), &url).await
    }

    async fn create(&self, resource: &str, body: Value) -> Result<Value, ClientError> {
        let url = self.url(&[resource]);
        self.send(self.client.post(&url).json(&body), &url).await
    }

    async fn update(&self, resource: &str, id: &str, body: Value) -> Result<Value, ClientError> {
        let url = self.url(&[resource, id]);
        self.send(self.client.post(&url).json(&body), &url).await
    }

    async fn delete(&self, resource: &str, id: &str) -> Result<(), ClientError> {
        let url = self.url(&[resource, id]);
        self.send(self.client.delete(&url), &url).await?;
        Ok(())
    }

    async fn get_nested(
        &self,
        resource: &str,
        id: &str,
        child: &str,
        query: &Query,
    ) -> Result<Value, ClientError> {
        let url = self.url(&[resource, id, child]);
        self.send(self.client.get(&url).query(query), &url).await
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Builder for HttpClient.
#[derive(Debug, Default)]
pub struct HttpClientBuilder {
    endpoint: Option<String>,
    timeout: Option<Duration>,
}

impl HttpClientBuilder {
    /// Set the server endpoint (e.g., "http://localhost:1492").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<HttpClient, ClientError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Http(e.to_string()))?;

        let endpoint = self
            .endpoint
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(HttpClient {
            client,
            description: format!("http: {}", endpoint),
            endpoint,
        })
    }
}

// Escape characters that would change the meaning of a path segment
fn urlencoded(s: &str) -> String {
    s.replace('%', "%25")
        .replace('/', "%2F")
        .replace('?', "%3F")
        .replace('#', "%23")
}
