//! Components that talk to the server and update [`ConsoleState`].
//!
//! Each component holds the shared client and state. None of them hold the
//! state lock across a request.
//!
//! - [`DeviceStatusMonitor`]: device connectivity
//! - [`SessionManager`]: sessions, annotations and commands
//! - [`StreamIngestor`]: windowed stream data for the active session
//! - [`HistoryFetcher`]: archived session data
//!
//! [`ConsoleState`]: crate::app::ConsoleState

pub mod device;
pub mod history;
pub mod session;
pub mod stream;

pub use device::DeviceStatusMonitor;
pub use history::HistoryFetcher;
pub use session::SessionManager;
pub use stream::StreamIngestor;
