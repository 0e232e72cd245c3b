//! # biomonitor-types
//!
//! Shared data types for the biomonitor console. These describe what the
//! biomonitor server sends and accepts: device connectivity, recording
//! sessions and their annotations, streamed data chunks, and archived
//! session history.
//!
//! ## Features
//!
//! - `serde`: JSON serialization matching the server's wire format
//!   (camelCase field names, `_id` accepted for session identifiers)
//!
//! ## Example
//!
//! ```rust
//! use biomonitor_types::{DataChunk, TimeWindow};
//!
//! let chunk = DataChunk::new(1, TimeWindow::new(10.0, 20.0), 72.0, 5.0)
//!     .with_samples(vec![(10.0, 0.4), (15.0, 0.6), (20.0, 0.5)]);
//!
//! assert_eq!(chunk.midpoint(), 15.0);
//! assert_eq!(chunk.last_timestamp(), Some(20.0));
//! ```

mod device;
mod history;
mod session;
mod stream;

pub use device::*;
pub use history::*;
pub use session::*;
pub use stream::*;

/// Physical channel number identifying a sensor input line.
pub type PhysicalChannel = u32;
