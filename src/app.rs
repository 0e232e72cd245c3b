//! Console state and component wiring.
//!
//! [`ConsoleState`] is the single state object every component mutates. It
//! is shared as [`SharedState`]; the lock is only held for synchronous
//! updates, never across a request, so each mutation is atomic with respect
//! to one resumed request.

use std::sync::Arc;

use parking_lot::Mutex;

use biomonitor_types::{ChannelConfig, DeviceStatus, HistoryRecord, Session, SessionSummary};

use crate::control::{DeviceStatusMonitor, HistoryFetcher, SessionManager, StreamIngestor};
use crate::data::MetricAggregator;
use crate::events::{NavigationReceiver, Navigator};
use crate::source::ResourceClient;

/// State shared by all components.
pub type SharedState = Arc<Mutex<ConsoleState>>;

/// Token captured when a guarded load is issued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    fn advance(&mut self) -> Generation {
        self.0 += 1;
        *self
    }
}

/// Orders overlapping loads of the same kind.
///
/// A response is applied unless a load issued after it has already been
/// applied. Failed loads never apply anything, so they cannot make a
/// concurrent load stale.
#[derive(Debug, Clone, Copy, Default)]
struct LoadGuard {
    issued: Generation,
    applied: Generation,
}

impl LoadGuard {
    fn issue(&mut self) -> Generation {
        self.issued.advance()
    }

    fn try_apply(&mut self, generation: Generation) -> bool {
        if generation <= self.applied {
            return false;
        }
        self.applied = generation;
        true
    }

    /// Make every load issued so far stale.
    fn invalidate(&mut self) {
        self.applied = self.issued;
    }
}

/// Result of a load whose response may have been overtaken.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome<T> {
    /// The response was applied to the state.
    Current(T),
    /// A newer load was applied while this one was in flight; nothing changed.
    Stale,
}

impl<T> LoadOutcome<T> {
    pub fn is_stale(&self) -> bool {
        matches!(self, LoadOutcome::Stale)
    }

    pub fn current(self) -> Option<T> {
        match self {
            LoadOutcome::Current(value) => Some(value),
            LoadOutcome::Stale => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> LoadOutcome<U> {
        match self {
            LoadOutcome::Current(value) => LoadOutcome::Current(f(value)),
            LoadOutcome::Stale => LoadOutcome::Stale,
        }
    }
}

/// Everything the console knows.
///
/// Fields are read through accessors; each one is written only by the
/// component that owns it.
#[derive(Debug)]
pub struct ConsoleState {
    device_status: DeviceStatus,
    active_session: Option<Session>,
    sessions: Vec<SessionSummary>,
    metrics: MetricAggregator,
    history: Option<HistoryRecord>,
    /// End of the last stream window applied for the active session.
    stream_cursor: Option<f64>,
    /// Bumped whenever the active session is installed or cleared.
    installed: Generation,
    session_loads: LoadGuard,
    list_loads: LoadGuard,
    history_loads: LoadGuard,
}

impl ConsoleState {
    /// Fresh state for the given channel catalog.
    pub fn new(catalog: Vec<ChannelConfig>) -> Self {
        Self {
            device_status: DeviceStatus::checking(),
            active_session: None,
            sessions: Vec::new(),
            metrics: MetricAggregator::new(catalog),
            history: None,
            stream_cursor: None,
            installed: Generation::default(),
            session_loads: LoadGuard::default(),
            list_loads: LoadGuard::default(),
            history_loads: LoadGuard::default(),
        }
    }

    /// Wrap the state for sharing between components.
    pub fn shared(catalog: Vec<ChannelConfig>) -> SharedState {
        Arc::new(Mutex::new(Self::new(catalog)))
    }

    pub fn device_status(&self) -> &DeviceStatus {
        &self.device_status
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.active_session.as_ref()
    }

    pub fn active_session_id(&self) -> Option<&str> {
        self.active_session.as_ref().map(|s| s.id.as_str())
    }

    pub fn sessions(&self) -> &[SessionSummary] {
        &self.sessions
    }

    /// Series of the active session.
    pub fn metrics(&self) -> &MetricAggregator {
        &self.metrics
    }

    pub fn history(&self) -> Option<&HistoryRecord> {
        self.history.as_ref()
    }

    /// Where the next back-to-back stream window starts.
    pub fn stream_cursor(&self) -> f64 {
        match (self.stream_cursor, self.metrics.high_water_mark()) {
            (Some(a), Some(b)) => a.max(b),
            (a, b) => a.or(b).unwrap_or(0.0),
        }
    }

    /// Generation of the installed active session.
    ///
    /// Changes every time a session is installed or cleared, never on a load
    /// that is merely in flight or that failed.
    pub fn session_generation(&self) -> Generation {
        self.installed
    }

    pub(crate) fn set_device_status(&mut self, status: DeviceStatus) {
        self.device_status = status;
    }

    pub(crate) fn metrics_mut(&mut self) -> &mut MetricAggregator {
        &mut self.metrics
    }

    pub(crate) fn begin_session_load(&mut self) -> Generation {
        self.session_loads.issue()
    }

    pub(crate) fn is_current_session(&self, generation: Generation) -> bool {
        self.installed == generation
    }

    /// Install a loaded session unless a later load was applied meanwhile.
    ///
    /// The metric series and stream cursor are reset in the same step, so
    /// they never hold data from a session other than the active one.
    pub(crate) fn activate_session(&mut self, load: Generation, session: Session) -> bool {
        if !self.session_loads.try_apply(load) {
            return false;
        }
        self.reset_session_data();
        self.active_session = Some(session);
        true
    }

    /// Drop the active session and its metrics; in-flight loads become stale.
    pub(crate) fn clear_active_session(&mut self) {
        self.session_loads.invalidate();
        self.reset_session_data();
        self.active_session = None;
    }

    fn reset_session_data(&mut self) {
        self.installed.advance();
        self.metrics.reset();
        self.stream_cursor = None;
    }

    /// Record that the window ending at `max_time` was applied.
    pub(crate) fn advance_stream_cursor(&mut self, max_time: f64) {
        self.stream_cursor = Some(self.stream_cursor.map_or(max_time, |c| c.max(max_time)));
    }

    pub(crate) fn begin_list_load(&mut self) -> Generation {
        self.list_loads.issue()
    }

    pub(crate) fn apply_session_list(
        &mut self,
        load: Generation,
        sessions: Vec<SessionSummary>,
    ) -> bool {
        if !self.list_loads.try_apply(load) {
            return false;
        }
        self.sessions = sessions;
        true
    }

    pub(crate) fn begin_history_load(&mut self) -> Generation {
        self.history_loads.issue()
    }

    pub(crate) fn apply_history(&mut self, load: Generation, record: HistoryRecord) -> bool {
        if !self.history_loads.try_apply(load) {
            return false;
        }
        self.history = Some(record);
        true
    }
}

/// All console components wired to one client, one state and one navigator.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use biomonitor_console::{Console, MemoryClient};
/// use biomonitor_types::ChannelConfig;
///
/// let client = Arc::new(MemoryClient::new());
/// let (console, _intents) = Console::new(client, ChannelConfig::default_catalog());
/// assert!(console.state().lock().active_session().is_none());
/// ```
#[derive(Debug)]
pub struct Console {
    state: SharedState,
    pub monitor: DeviceStatusMonitor,
    pub sessions: SessionManager,
    pub stream: StreamIngestor,
    pub history: HistoryFetcher,
}

impl Console {
    /// Create the components. Navigation intents arrive on the returned receiver.
    pub fn new(
        client: Arc<dyn ResourceClient>,
        catalog: Vec<ChannelConfig>,
    ) -> (Self, NavigationReceiver) {
        let state = ConsoleState::shared(catalog);
        let (navigator, receiver) = Navigator::channel();

        let console = Self {
            monitor: DeviceStatusMonitor::new(client.clone(), state.clone(), navigator.clone()),
            sessions: SessionManager::new(client.clone(), state.clone(), navigator),
            stream: StreamIngestor::new(client.clone(), state.clone()),
            history: HistoryFetcher::new(client, state.clone()),
            state,
        };
        (console, receiver)
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biomonitor_types::{DataChunk, TimeWindow};

    fn session(id: &str) -> Session {
        Session {
            id: id.to_string(),
            ..Default::default()
        }
    }

    fn chunk(min: f64, max: f64) -> DataChunk {
        DataChunk::new(0, TimeWindow::new(min, max), 60.0, 1.0)
    }

    #[test]
    fn new_state_is_checking_with_no_session() {
        let state = ConsoleState::new(ChannelConfig::default_catalog());
        assert_eq!(state.device_status(), &DeviceStatus::checking());
        assert!(state.active_session().is_none());
        assert!(state.sessions().is_empty());
        assert!(state.history().is_none());
        assert_eq!(state.stream_cursor(), 0.0);
    }

    #[test]
    fn activation_resets_metrics_and_cursor() {
        let mut state = ConsoleState::new(ChannelConfig::default_catalog());
        let load = state.begin_session_load();
        assert!(state.activate_session(load, session("a")));
        state.metrics_mut().ingest(&[chunk(0.0, 1.0)]).unwrap();
        state.advance_stream_cursor(4.0);

        let load = state.begin_session_load();
        assert!(state.activate_session(load, session("b")));
        assert!(state.metrics().is_empty());
        assert_eq!(state.stream_cursor(), 0.0);
        assert_eq!(state.active_session_id(), Some("b"));
    }

    #[test]
    fn older_load_is_not_applied_after_newer() {
        let mut state = ConsoleState::new(ChannelConfig::default_catalog());
        let older = state.begin_session_load();
        let newer = state.begin_session_load();

        assert!(state.activate_session(newer, session("new")));
        assert!(!state.activate_session(older, session("old")));
        assert_eq!(state.active_session_id(), Some("new"));
    }

    #[test]
    fn unresolved_newer_load_does_not_block_older() {
        let mut state = ConsoleState::new(ChannelConfig::default_catalog());
        let older = state.begin_session_load();
        let _failed = state.begin_session_load();

        assert!(state.activate_session(older, session("a")));
    }

    #[test]
    fn session_generation_moves_only_on_install() {
        let mut state = ConsoleState::new(ChannelConfig::default_catalog());
        let before = state.session_generation();
        let load = state.begin_session_load();
        assert_eq!(state.session_generation(), before);

        state.activate_session(load, session("a"));
        assert!(!state.is_current_session(before));
        let installed = state.session_generation();

        state.clear_active_session();
        assert!(!state.is_current_session(installed));
    }

    #[test]
    fn clearing_invalidates_in_flight_loads() {
        let mut state = ConsoleState::new(ChannelConfig::default_catalog());
        let load = state.begin_session_load();
        state.clear_active_session();
        assert!(!state.activate_session(load, session("a")));
        assert!(state.active_session().is_none());
    }

    #[test]
    fn stream_cursor_uses_furthest_of_requested_and_ingested() {
        let mut state = ConsoleState::new(ChannelConfig::default_catalog());
        state.advance_stream_cursor(3.0);
        state.advance_stream_cursor(2.0);
        assert_eq!(state.stream_cursor(), 3.0);

        state.metrics_mut().ingest(&[chunk(3.0, 5.0)]).unwrap();
        assert_eq!(state.stream_cursor(), 5.0);
    }

    #[test]
    fn list_and_history_loads_are_independent() {
        let mut state = ConsoleState::new(ChannelConfig::default_catalog());
        let list = state.begin_list_load();
        let history = state.begin_history_load();
        state.begin_session_load();

        assert!(state.apply_session_list(list, vec![session("a").summary()]));
        assert!(state.apply_history(history, HistoryRecord::default()));
        assert_eq!(state.sessions().len(), 1);
    }

    #[test]
    fn load_outcome_helpers() {
        assert_eq!(LoadOutcome::Current(2).map(|n| n * 2).current(), Some(4));
        assert!(LoadOutcome::<u8>::Stale.is_stale());
        assert_eq!(LoadOutcome::<u8>::Stale.current(), None);
    }
}
