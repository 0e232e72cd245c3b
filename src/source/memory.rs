//! In-process resource client.
//!
//! Keeps sessions, annotations, streamed chunks and history in memory and
//! answers requests the way the biomonitor server does. Useful for tests and
//! for running the console without hardware. Requests can be made to fail or
//! to resolve late, which is how out-of-order responses are reproduced.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use biomonitor_types::{
    Annotation, DataChunk, DeviceStatus, HistoryRecord, NewAnnotation, NewSession, Session,
    TimeWindow,
};

use super::{decode, ClientError, Query, ResourceClient, ANNOTATION, ANNOTATIONS, SESSION, SESSIONS, STATUS};

/// A resource client backed by in-memory state.
///
/// # Example
///
/// ```
/// use biomonitor_console::MemoryClient;
/// use biomonitor_types::DeviceStatus;
///
/// let client = MemoryClient::new();
/// client.set_status(DeviceStatus::checking());
/// client.fail("GET status");
/// ```
#[derive(Debug, Default)]
pub struct MemoryClient {
    backend: Mutex<Backend>,
}

#[derive(Debug, Default)]
struct Backend {
    status: DeviceStatus,
    sessions: BTreeMap<String, Session>,
    annotations: BTreeMap<String, Annotation>,
    chunks: HashMap<String, Vec<DataChunk>>,
    history: HashMap<String, HistoryRecord>,
    failing: BTreeSet<String>,
    delays: HashMap<String, Duration>,
    requests: Vec<String>,
    updates: Vec<(String, Value)>,
    next_id: u64,
}

impl Backend {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn session_with_annotations(&self, id: &str) -> Option<Session> {
        let mut session = self.sessions.get(id)?.clone();
        session.annotations = self
            .annotations
            .values()
            .filter(|a| a.owner_id == id)
            .cloned()
            .collect();
        Some(session)
    }
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status returned by `GET status`.
    pub fn set_status(&self, status: DeviceStatus) {
        self.backend.lock().status = status;
    }

    /// Store a session as if it had been created earlier.
    pub fn insert_session(&self, session: Session) {
        self.backend.lock().sessions.insert(session.id.clone(), session);
    }

    /// Store an annotation as if it had been created earlier.
    pub fn insert_annotation(&self, annotation: Annotation) {
        self.backend
            .lock()
            .annotations
            .insert(annotation.id.clone(), annotation);
    }

    /// Make chunks available on a session's stream.
    ///
    /// A stream request returns every stored chunk whose window lies inside
    /// the requested window.
    pub fn push_chunks(&self, session_id: &str, chunks: impl IntoIterator<Item = DataChunk>) {
        self.backend
            .lock()
            .chunks
            .entry(session_id.to_string())
            .or_default()
            .extend(chunks);
    }

    /// Record returned by a session's history request.
    pub fn set_history(&self, session_id: &str, record: HistoryRecord) {
        self.backend
            .lock()
            .history
            .insert(session_id.to_string(), record);
    }

    /// Make a request fail, keyed like `"GET status"` or `"DELETE annotation/a1"`.
    pub fn fail(&self, request: &str) {
        self.backend.lock().failing.insert(request.to_string());
    }

    /// Stop failing a request.
    pub fn recover(&self, request: &str) {
        self.backend.lock().failing.remove(request);
    }

    /// Delay the response to a request, keyed like [`MemoryClient::fail`].
    pub fn delay(&self, request: &str, delay: Duration) {
        self.backend
            .lock()
            .delays
            .insert(request.to_string(), delay);
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.backend.lock().requests.clone()
    }

    /// Bodies received by `update` requests, with their target path.
    pub fn updates(&self) -> Vec<(String, Value)> {
        self.backend.lock().updates.clone()
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.backend.lock().sessions.keys().cloned().collect()
    }

    /// Log the request, apply any configured delay, and fail if asked to.
    async fn begin(&self, key: String) -> Result<(), ClientError> {
        let delay = {
            let mut backend = self.backend.lock();
            backend.requests.push(key.clone());
            backend.delays.get(&key).copied()
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.backend.lock().failing.contains(&key) {
            return Err(ClientError::Connection(format!("{} refused", key)));
        }
        Ok(())
    }
}

fn query_value(query: &Query, key: &str) -> Option<f64> {
    query
        .iter()
        .find(|(k, _)| k == key)
        .and_then(|(_, v)| v.parse().ok())
}

#[async_trait]
impl ResourceClient for MemoryClient {
    async fn get_static(&self, resource: &str) -> Result<Value, ClientError> {
        self.begin(format!("GET {}", resource)).await?;
        let backend = self.backend.lock();
        match resource {
            STATUS => Ok(serde_json::to_value(&backend.status)?),
            SESSIONS => {
                let summaries: Vec<_> = backend.sessions.values().map(|s| s.summary()).collect();
                Ok(serde_json::to_value(summaries)?)
            }
            other => Err(ClientError::NotFound(other.to_string())),
        }
    }

    async fn get(&self, resource: &str, id: &str) -> Result<Value, ClientError> {
        let path = format!("{}/{}", resource, id);
        self.begin(format!("GET {}", path)).await?;
        let backend = self.backend.lock();
        match resource {
            SESSION => {
                let session = backend
                    .session_with_annotations(id)
                    .ok_or(ClientError::NotFound(path))?;
                Ok(serde_json::to_value(session)?)
            }
            _ => Err(ClientError::NotFound(path)),
        }
    }

    async fn create(&self, resource: &str, body: Value) -> Result<Value, ClientError> {
        self.begin(format!("POST {}", resource)).await?;
        let mut backend = self.backend.lock();
        match resource {
            SESSIONS => {
                let new: NewSession = decode(body)?;
                let session = Session {
                    id: backend.next_id("session"),
                    name: new.name,
                    description: new.description,
                    created_at: None,
                    channels: new.channels,
                    annotations: Vec::new(),
                };
                backend.sessions.insert(session.id.clone(), session.clone());
                Ok(serde_json::to_value(session)?)
            }
            ANNOTATIONS => {
                let new: NewAnnotation = decode(body)?;
                let annotation = Annotation {
                    id: backend.next_id("annotation"),
                    owner_id: new.owner_id,
                    time: new.time,
                    text: new.text,
                    physical_channel: new.physical_channel,
                };
                backend
                    .annotations
                    .insert(annotation.id.clone(), annotation.clone());
                Ok(serde_json::to_value(annotation)?)
            }
            other => Err(ClientError::NotFound(other.to_string())),
        }
    }

    async fn update(&self, resource: &str, id: &str, body: Value) -> Result<Value, ClientError> {
        let path = format!("{}/{}", resource, id);
        self.begin(format!("POST {}", path)).await?;
        let mut backend = self.backend.lock();
        if resource != SESSION || !backend.sessions.contains_key(id) {
            return Err(ClientError::NotFound(path));
        }
        backend.updates.push((path, body));
        Ok(json!({ "id": id }))
    }

    async fn delete(&self, resource: &str, id: &str) -> Result<(), ClientError> {
        let path = format!("{}/{}", resource, id);
        self.begin(format!("DELETE {}", path)).await?;
        let mut backend = self.backend.lock();
        let removed = match resource {
            SESSION => {
                backend.annotations.retain(|_, a| a.owner_id != id);
                backend.chunks.remove(id);
                backend.sessions.remove(id).is_some()
            }
            ANNOTATION => backend.annotations.remove(id).is_some(),
            _ => false,
        };
        if removed {
            Ok(())
        } else {
            Err(ClientError::NotFound(path))
        }
    }

    async fn get_nested(
        &self,
        resource: &str,
        id: &str,
        child: &str,
        query: &Query,
    ) -> Result<Value, ClientError> {
        let path = format!("{}/{}/{}", resource, id, child);
        self.begin(format!("GET {}", path)).await?;
        let backend = self.backend.lock();
        if resource != SESSION || !backend.sessions.contains_key(id) {
            return Err(ClientError::NotFound(path));
        }

        match child {
            "stream" => {
                let window = TimeWindow::new(
                    query_value(query, "min").unwrap_or(f64::NEG_INFINITY),
                    query_value(query, "max").unwrap_or(f64::INFINITY),
                );
                let chunks: Vec<&DataChunk> = backend
                    .chunks
                    .get(id)
                    .map(|chunks| chunks.iter().filter(|c| window.contains(&c.window())).collect())
                    .unwrap_or_default();
                Ok(serde_json::to_value(chunks)?)
            }
            "history" => {
                let record = backend.history.get(id).cloned().unwrap_or_default();
                Ok(serde_json::to_value(record)?)
            }
            _ => Err(ClientError::NotFound(path)),
        }
    }

    fn description(&self) -> &str {
        "memory"
    }
}
