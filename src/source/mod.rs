//! Resource client abstraction for talking to the biomonitor server.
//!
//! The console never issues requests itself; every component goes through a
//! [`ResourceClient`], which performs get/list/create/update/delete requests
//! against a named resource type and hands back raw JSON. Decoding into the
//! typed model happens in the components.

mod error;
mod http;
mod memory;

pub use error::ClientError;
pub use http::{HttpClient, HttpClientBuilder, DEFAULT_ENDPOINT};
pub use memory::MemoryClient;

use std::fmt::Debug;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Device connectivity, a static resource.
pub const STATUS: &str = "status";
/// Collection of sessions (list, create).
pub const SESSIONS: &str = "sessions";
/// A single session (get, command, delete).
pub const SESSION: &str = "session";
/// Collection of annotations (create).
pub const ANNOTATIONS: &str = "annotations";
/// A single annotation (delete).
pub const ANNOTATION: &str = "annotation";

/// Query parameters as ordered `(key, value)` pairs.
pub type Query = [(String, String)];

/// Trait for performing requests against named server resources.
///
/// Implementations exist for the HTTP API ([`HttpClient`]) and for an
/// in-process backend ([`MemoryClient`]).
///
/// # Example
///
/// ```no_run
/// use biomonitor_console::{HttpClient, ResourceClient};
///
/// # tokio_test::block_on(async {
/// let client = HttpClient::builder().endpoint("http://localhost:1492").build()?;
/// let status = client.get_static("status").await?;
/// println!("{}", status);
/// # Ok::<(), biomonitor_console::ClientError>(())
/// # });
/// ```
#[async_trait]
pub trait ResourceClient: Send + Sync + Debug {
    /// Fetch a resource that has no id, e.g. `status`.
    async fn get_static(&self, resource: &str) -> Result<Value, ClientError>;

    /// Fetch a collection, e.g. `sessions`.
    async fn list(&self, resource: &str) -> Result<Value, ClientError> {
        self.get_static(resource).await
    }

    /// Fetch `resource/id`.
    async fn get(&self, resource: &str, id: &str) -> Result<Value, ClientError>;

    /// Create a new member of the `resource` collection.
    async fn create(&self, resource: &str, body: Value) -> Result<Value, ClientError>;

    /// Send an update to `resource/id`.
    async fn update(&self, resource: &str, id: &str, body: Value) -> Result<Value, ClientError>;

    /// Delete `resource/id`.
    async fn delete(&self, resource: &str, id: &str) -> Result<(), ClientError>;

    /// Fetch `resource/id/child` with query parameters, e.g. a session's
    /// stream window or history.
    async fn get_nested(
        &self,
        resource: &str,
        id: &str,
        child: &str,
        query: &Query,
    ) -> Result<Value, ClientError>;

    /// Returns a human-readable description of the client, e.g. its endpoint.
    fn description(&self) -> &str;
}

/// Decode a JSON response into a typed value.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ClientError> {
    Ok(serde_json::from_value(value)?)
}
