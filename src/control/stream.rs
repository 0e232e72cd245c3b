//! Pulling time-windowed data for the active session.

use std::sync::Arc;

use tracing::debug;

use biomonitor_types::{DataChunk, TimeWindow};

use crate::app::{Generation, LoadOutcome, SharedState};
use crate::data::IngestReport;
use crate::error::ConsoleError;
use crate::source::{decode, ResourceClient, SESSION};

/// Requests stream windows for the active session and feeds the aggregator.
///
/// Chunks are passed on exactly as received. Requesting overlapping windows
/// produces duplicate points; use [`advance`] to walk the stream in
/// back-to-back windows.
///
/// [`advance`]: StreamIngestor::advance
#[derive(Debug, Clone)]
pub struct StreamIngestor {
    client: Arc<dyn ResourceClient>,
    state: SharedState,
}

impl StreamIngestor {
    pub fn new(client: Arc<dyn ResourceClient>, state: SharedState) -> Self {
        Self { client, state }
    }

    /// Fetch the chunks of `window` for the active session and ingest them.
    ///
    /// Resolves to [`LoadOutcome::Stale`] if a session was installed or
    /// cleared while the request was in flight; the chunks are then dropped.
    pub async fn update_stream(
        &self,
        session_id: &str,
        window: TimeWindow,
    ) -> Result<LoadOutcome<IngestReport>, ConsoleError> {
        if !window.is_valid() {
            return Err(ConsoleError::InvalidWindow {
                min: window.min_time,
                max: window.max_time,
            });
        }
        let generation = self.active_generation(session_id)?;

        let query = vec![
            ("min".to_string(), window.min_time.to_string()),
            ("max".to_string(), window.max_time.to_string()),
        ];
        let value = self
            .client
            .get_nested(SESSION, session_id, "stream", &query)
            .await?;
        let chunks: Vec<DataChunk> = decode(value)?;

        let mut state = self.state.lock();
        if !state.is_current_session(generation) {
            debug!(session = %session_id, "session changed during stream request, dropping chunks");
            return Ok(LoadOutcome::Stale);
        }

        let report = state.metrics_mut().ingest(&chunks)?;
        state.advance_stream_cursor(window.max_time);
        debug!(
            session = %session_id,
            min = window.min_time,
            max = window.max_time,
            chunks = report.appended,
            "stream window ingested"
        );
        Ok(LoadOutcome::Current(report))
    }

    /// Fetch the next `span` seconds after the last applied window.
    ///
    /// The first window of a session starts at 0. The cursor moves even when
    /// a window holds no data, so gaps and late-starting streams are walked
    /// through rather than re-requested.
    pub async fn advance(
        &self,
        session_id: &str,
        span: f64,
    ) -> Result<LoadOutcome<IngestReport>, ConsoleError> {
        let start = self.state.lock().stream_cursor();
        self.update_stream(session_id, TimeWindow::starting_at(start, span))
            .await
    }

    fn active_generation(&self, session_id: &str) -> Result<Generation, ConsoleError> {
        let state = self.state.lock();
        match state.active_session_id() {
            None => Err(ConsoleError::NoActiveSession),
            Some(active) if active != session_id => Err(ConsoleError::NotActiveSession {
                requested: session_id.to_string(),
            }),
            Some(_) => Ok(state.session_generation()),
        }
    }
}
