//! Errors surfaced by console operations.

use thiserror::Error;

use crate::data::IngestError;
use crate::source::ClientError;

/// Errors returned by session, stream and history operations.
///
/// Connectivity failures of the status poll never appear here; the monitor
/// recovers from them by falling back to a fixed status.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// The request to the server failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The server sent chunks the aggregator cannot accept.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// A requested time window is inverted or not finite.
    #[error("invalid time window [{min}, {max}]")]
    InvalidWindow { min: f64, max: f64 },

    /// The operation needs an active session and there is none.
    #[error("no active session")]
    NoActiveSession,

    /// The operation targets a session other than the active one.
    #[error("session {requested} is not the active session")]
    NotActiveSession { requested: String },
}
