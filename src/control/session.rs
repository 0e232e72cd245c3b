//! Session lifecycle, annotations and session commands.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use biomonitor_types::{
    Annotation, NewAnnotation, NewSession, Session, SessionCommand, SessionSummary,
};

use crate::app::{LoadOutcome, SharedState};
use crate::error::ConsoleError;
use crate::events::{NavigationIntent, Navigator};
use crate::source::{decode, ClientError, ResourceClient, ANNOTATION, ANNOTATIONS, SESSION, SESSIONS};

/// Creates, loads, lists and deletes sessions, and owns the active session.
///
/// Loads that replace the active session are guarded by a generation token:
/// when two loads overlap, only the most recently issued one is applied and
/// the other resolves to [`LoadOutcome::Stale`].
#[derive(Debug, Clone)]
pub struct SessionManager {
    client: Arc<dyn ResourceClient>,
    state: SharedState,
    navigator: Navigator,
}

impl SessionManager {
    pub fn new(client: Arc<dyn ResourceClient>, state: SharedState, navigator: Navigator) -> Self {
        Self {
            client,
            state,
            navigator,
        }
    }

    /// Create a session, make it active and ask the router to open it.
    pub async fn create_session(
        &self,
        payload: NewSession,
    ) -> Result<LoadOutcome<Session>, ConsoleError> {
        let generation = self.state.lock().begin_session_load();
        let body = serde_json::to_value(&payload).map_err(ClientError::from)?;
        let session: Session = decode(self.client.create(SESSIONS, body).await?)?;

        if !self.state.lock().activate_session(generation, session.clone()) {
            debug!(session = %session.id, "created session superseded by a newer load");
            return Ok(LoadOutcome::Stale);
        }

        info!(session = %session.id, name = %session.name, "session created");
        self.navigator
            .emit(NavigationIntent::Session(session.id.clone()));
        Ok(LoadOutcome::Current(session))
    }

    /// Load a session and make it the active one, resetting the metrics.
    pub async fn get_session(&self, id: &str) -> Result<LoadOutcome<Session>, ConsoleError> {
        let generation = self.state.lock().begin_session_load();
        let session: Session = decode(self.client.get(SESSION, id).await?)?;

        if !self.state.lock().activate_session(generation, session.clone()) {
            debug!(session = %id, "discarding stale session response");
            return Ok(LoadOutcome::Stale);
        }

        debug!(session = %id, annotations = session.annotations.len(), "session loaded");
        Ok(LoadOutcome::Current(session))
    }

    /// Fetch the session list and replace the stored one.
    pub async fn list_sessions(&self) -> Result<LoadOutcome<Vec<SessionSummary>>, ConsoleError> {
        let generation = self.state.lock().begin_list_load();
        let sessions: Vec<SessionSummary> = decode(self.client.list(SESSIONS).await?)?;

        if !self
            .state
            .lock()
            .apply_session_list(generation, sessions.clone())
        {
            debug!("discarding stale session list");
            return Ok(LoadOutcome::Stale);
        }
        Ok(LoadOutcome::Current(sessions))
    }

    /// Delete a session, then re-fetch the session list.
    ///
    /// Deleting the active session also clears it along with its metrics.
    pub async fn delete_session(
        &self,
        id: &str,
    ) -> Result<LoadOutcome<Vec<SessionSummary>>, ConsoleError> {
        self.client.delete(SESSION, id).await?;
        info!(session = %id, "session deleted");

        {
            let mut state = self.state.lock();
            if state.active_session_id() == Some(id) {
                state.clear_active_session();
            }
        }

        self.list_sessions().await
    }

    /// Create an annotation, then reload its owning session so the active
    /// session carries the updated annotation list.
    ///
    /// The reload goes through [`get_session`], so the metric series and the
    /// stream cursor are reset: annotating during a live stream starts the
    /// series over from the beginning of the session.
    ///
    /// [`get_session`]: SessionManager::get_session
    pub async fn create_annotation(
        &self,
        payload: NewAnnotation,
    ) -> Result<Annotation, ConsoleError> {
        let body = serde_json::to_value(&payload).map_err(ClientError::from)?;
        let annotation: Annotation = decode(self.client.create(ANNOTATIONS, body).await?)?;
        debug!(annotation = %annotation.id, session = %payload.owner_id, "annotation created");

        self.get_session(&payload.owner_id).await?;
        Ok(annotation)
    }

    /// Delete an annotation.
    ///
    /// If the active session holds the annotation it is reloaded afterwards.
    /// A failed delete is returned and nothing is reloaded.
    pub async fn delete_annotation(&self, id: &str) -> Result<(), ConsoleError> {
        if let Err(e) = self.client.delete(ANNOTATION, id).await {
            warn!(annotation = %id, error = %e, "annotation delete failed");
            return Err(e.into());
        }

        let owner = {
            let state = self.state.lock();
            state
                .active_session()
                .filter(|s| s.has_annotation(id))
                .map(|s| s.id.clone())
        };

        if let Some(owner) = owner {
            self.get_session(&owner).await?;
        }
        Ok(())
    }

    /// Send an operational command to the active session.
    ///
    /// Failures are logged and returned; there is no retry.
    pub async fn session_command(
        &self,
        session_id: &str,
        command: SessionCommand,
    ) -> Result<(), ConsoleError> {
        {
            let state = self.state.lock();
            match state.active_session_id() {
                None => return Err(ConsoleError::NoActiveSession),
                Some(active) if active != session_id => {
                    return Err(ConsoleError::NotActiveSession {
                        requested: session_id.to_string(),
                    })
                }
                Some(_) => {}
            }
        }

        let body = json!({ "id": session_id, "command": command });
        match self.client.update(SESSION, session_id, body).await {
            Ok(_) => {
                info!(session = %session_id, command = command.wire_name(), "session command sent");
                Ok(())
            }
            Err(e) => {
                warn!(
                    session = %session_id,
                    command = command.wire_name(),
                    error = %e,
                    "session command failed"
                );
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ConsoleState;
    use crate::events::{drain, NavigationReceiver};
    use crate::source::MemoryClient;
    use biomonitor_types::{ChannelConfig, DataChunk, TimeWindow};

    fn manager(client: Arc<MemoryClient>) -> (SessionManager, SharedState, NavigationReceiver) {
        let state = ConsoleState::shared(ChannelConfig::default_catalog());
        let (navigator, receiver) = Navigator::channel();
        (
            SessionManager::new(client, state.clone(), navigator),
            state,
            receiver,
        )
    }

    fn stored_session(id: &str) -> Session {
        Session {
            id: id.to_string(),
            name: format!("Session {}", id),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_session_activates_and_navigates() {
        let client = Arc::new(MemoryClient::new());
        let (manager, state, mut intents) = manager(client);

        let created = manager
            .create_session(NewSession {
                name: "Resting".to_string(),
                ..Default::default()
            })
            .await
            .unwrap()
            .current()
            .unwrap();

        assert_eq!(state.lock().active_session_id(), Some(created.id.as_str()));
        assert_eq!(drain(&mut intents), vec![NavigationIntent::Session(created.id)]);
    }

    #[tokio::test]
    async fn get_session_clears_metrics() {
        let client = Arc::new(MemoryClient::new());
        client.insert_session(stored_session("a"));
        client.insert_session(stored_session("b"));
        let (manager, state, _intents) = manager(client);

        manager.get_session("a").await.unwrap();
        state
            .lock()
            .metrics_mut()
            .ingest(&[DataChunk::new(1, TimeWindow::new(0.0, 1.0), 70.0, 2.0)])
            .unwrap();

        manager.get_session("b").await.unwrap();

        let state = state.lock();
        assert_eq!(state.active_session_id(), Some("b"));
        assert!(state.metrics().is_empty());
    }

    #[tokio::test]
    async fn get_session_failure_propagates_and_keeps_state() {
        let client = Arc::new(MemoryClient::new());
        client.insert_session(stored_session("a"));
        let (manager, state, _intents) = manager(client);
        manager.get_session("a").await.unwrap();

        let err = manager.get_session("missing").await.unwrap_err();

        assert!(matches!(err, ConsoleError::Client(_)));
        assert_eq!(state.lock().active_session_id(), Some("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_load_does_not_supersede_pending_one() {
        let client = Arc::new(MemoryClient::new());
        client.insert_session(stored_session("a"));
        client.delay("GET session/a", std::time::Duration::from_millis(50));
        let (manager, state, _intents) = manager(client);

        let (loaded, missing) = tokio::join!(manager.get_session("a"), manager.get_session("missing"));

        assert!(missing.is_err());
        assert!(!loaded.unwrap().is_stale());
        assert_eq!(state.lock().active_session_id(), Some("a"));
    }

    #[tokio::test]
    async fn delete_session_refreshes_list() {
        let client = Arc::new(MemoryClient::new());
        client.insert_session(stored_session("a"));
        client.insert_session(stored_session("b"));
        let (manager, state, _intents) = manager(client.clone());
        manager.list_sessions().await.unwrap();
        assert_eq!(state.lock().sessions().len(), 2);

        let remaining = manager.delete_session("a").await.unwrap().current().unwrap();

        assert_eq!(remaining.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(state.lock().sessions(), remaining.as_slice());
        assert_eq!(client.requests().last().map(String::as_str), Some("GET sessions"));
    }

    #[tokio::test]
    async fn deleting_active_session_clears_it() {
        let client = Arc::new(MemoryClient::new());
        client.insert_session(stored_session("a"));
        let (manager, state, _intents) = manager(client);
        manager.get_session("a").await.unwrap();

        manager.delete_session("a").await.unwrap();

        assert!(state.lock().active_session().is_none());
    }

    #[tokio::test]
    async fn create_annotation_reloads_owner() {
        let client = Arc::new(MemoryClient::new());
        client.insert_session(stored_session("a"));
        let (manager, state, _intents) = manager(client);
        manager.get_session("a").await.unwrap();
        {
            let mut state = state.lock();
            state
                .metrics_mut()
                .ingest(&[DataChunk::new(0, TimeWindow::new(0.0, 1.0), 70.0, 2.0)])
                .unwrap();
            state.advance_stream_cursor(1.0);
        }

        let annotation = manager
            .create_annotation(NewAnnotation {
                owner_id: "a".to_string(),
                time: 12.5,
                text: "patient moved".to_string(),
                physical_channel: Some(0),
            })
            .await
            .unwrap();

        let state = state.lock();
        let active = state.active_session().unwrap();
        assert!(active.has_annotation(&annotation.id));
        assert!(state.metrics().is_empty());
        assert_eq!(state.stream_cursor(), 0.0);
    }

    #[tokio::test]
    async fn delete_annotation_failure_is_returned() {
        let client = Arc::new(MemoryClient::new());
        let (manager, _state, _intents) = manager(client);

        let err = manager.delete_annotation("nope").await.unwrap_err();
        assert!(matches!(err, ConsoleError::Client(_)));
    }

    #[tokio::test]
    async fn delete_annotation_reloads_active_owner() {
        let client = Arc::new(MemoryClient::new());
        client.insert_session(stored_session("a"));
        client.insert_annotation(Annotation {
            id: "n1".to_string(),
            owner_id: "a".to_string(),
            ..Default::default()
        });
        let (manager, state, _intents) = manager(client);
        manager.get_session("a").await.unwrap();
        assert!(state.lock().active_session().unwrap().has_annotation("n1"));

        manager.delete_annotation("n1").await.unwrap();

        assert!(!state.lock().active_session().unwrap().has_annotation("n1"));
    }

    #[tokio::test]
    async fn command_requires_active_session() {
        let client = Arc::new(MemoryClient::new());
        client.insert_session(stored_session("a"));
        client.insert_session(stored_session("b"));
        let (manager, _state, _intents) = manager(client.clone());

        let err = manager
            .session_command("a", SessionCommand::StartCollection)
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::NoActiveSession));

        manager.get_session("a").await.unwrap();
        let err = manager
            .session_command("b", SessionCommand::StartCollection)
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::NotActiveSession { .. }));

        manager
            .session_command("a", SessionCommand::StartCollection)
            .await
            .unwrap();
        let updates = client.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "session/a");
        assert_eq!(updates[0].1["command"], "COLLECT");
        assert_eq!(updates[0].1["id"], "a");
    }

    #[tokio::test]
    async fn command_failure_is_returned() {
        let client = Arc::new(MemoryClient::new());
        client.insert_session(stored_session("a"));
        let (manager, _state, _intents) = manager(client.clone());
        manager.get_session("a").await.unwrap();
        client.fail("POST session/a");

        let result = manager
            .session_command("a", SessionCommand::StopCollection)
            .await;
        assert!(matches!(result, Err(ConsoleError::Client(_))));
    }
}
