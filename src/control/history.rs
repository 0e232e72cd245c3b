//! Archived session data.

use std::sync::Arc;

use tracing::debug;

use biomonitor_types::{HistoryParams, HistoryRecord};

use crate::app::{LoadOutcome, SharedState};
use crate::error::ConsoleError;
use crate::source::{decode, ResourceClient, SESSION};

/// Retrieves the full recorded series of a session.
#[derive(Debug, Clone)]
pub struct HistoryFetcher {
    client: Arc<dyn ResourceClient>,
    state: SharedState,
}

impl HistoryFetcher {
    pub fn new(client: Arc<dyn ResourceClient>, state: SharedState) -> Self {
        Self { client, state }
    }

    /// Fetch the history of `session_id` and replace the stored record.
    ///
    /// Any session may be queried, not only the active one.
    pub async fn get_history(
        &self,
        session_id: &str,
        params: &HistoryParams,
    ) -> Result<LoadOutcome<HistoryRecord>, ConsoleError> {
        let generation = self.state.lock().begin_history_load();

        let value = self
            .client
            .get_nested(SESSION, session_id, "history", &query(params))
            .await?;
        let mut record: HistoryRecord = decode(value)?;
        if record.session_id.is_empty() {
            record.session_id = session_id.to_string();
        }

        if !self.state.lock().apply_history(generation, record.clone()) {
            debug!(session = %session_id, "discarding stale history response");
            return Ok(LoadOutcome::Stale);
        }

        debug!(
            session = %session_id,
            channels = record.channels.len(),
            samples = record.sample_count(),
            "history loaded"
        );
        Ok(LoadOutcome::Current(record))
    }
}

fn query(params: &HistoryParams) -> Vec<(String, String)> {
    let mut query = Vec::new();
    if let Some(min) = params.min_time {
        query.push(("min".to_string(), min.to_string()));
    }
    if let Some(max) = params.max_time {
        query.push(("max".to_string(), max.to_string()));
    }
    if !params.channels.is_empty() {
        let channels: Vec<String> = params.channels.iter().map(|c| c.to_string()).collect();
        query.push(("channels".to_string(), channels.join(",")));
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::app::ConsoleState;
    use crate::source::MemoryClient;
    use biomonitor_types::{ChannelConfig, ChannelHistory, Session};

    fn record(values: &[f64]) -> HistoryRecord {
        let mut record = HistoryRecord::default();
        record.channels.insert(
            0,
            ChannelHistory {
                time: (0..values.len()).map(|i| i as f64).collect(),
                values: values.to_vec(),
            },
        );
        record
    }

    fn setup() -> (Arc<MemoryClient>, HistoryFetcher, SharedState) {
        let client = Arc::new(MemoryClient::new());
        for id in ["a", "b"] {
            client.insert_session(Session {
                id: id.to_string(),
                ..Default::default()
            });
        }
        let state = ConsoleState::shared(ChannelConfig::default_catalog());
        let fetcher = HistoryFetcher::new(client.clone(), state.clone());
        (client, fetcher, state)
    }

    #[test]
    fn query_includes_only_given_params() {
        assert!(query(&HistoryParams::new()).is_empty());

        let params = HistoryParams::new().min_time(1.5).channel(0).channel(2);
        assert_eq!(
            query(&params),
            vec![
                ("min".to_string(), "1.5".to_string()),
                ("channels".to_string(), "0,2".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn history_replaces_stored_record() {
        let (client, fetcher, state) = setup();
        client.set_history("a", record(&[1.0, 2.0]));

        let loaded = fetcher
            .get_history("a", &HistoryParams::new())
            .await
            .unwrap()
            .current()
            .unwrap();

        assert_eq!(loaded.session_id, "a");
        assert_eq!(loaded.sample_count(), 2);
        assert_eq!(state.lock().history(), Some(&loaded));
    }

    #[tokio::test]
    async fn missing_session_is_an_error() {
        let (_client, fetcher, state) = setup();

        let err = fetcher
            .get_history("zzz", &HistoryParams::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ConsoleError::Client(_)));
        assert!(state.lock().history().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn slower_older_request_is_discarded() {
        let (client, fetcher, state) = setup();
        client.set_history("a", record(&[1.0]));
        client.set_history("b", record(&[2.0, 3.0]));
        client.delay("GET session/a/history", Duration::from_millis(50));

        let params = HistoryParams::new();
        let (first, second) = tokio::join!(
            fetcher.get_history("a", &params),
            fetcher.get_history("b", &params)
        );

        assert!(first.unwrap().is_stale());
        assert!(!second.unwrap().is_stale());
        assert_eq!(state.lock().history().map(|r| r.session_id.as_str()), Some("b"));
    }
}
