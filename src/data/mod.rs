//! Derived data for display.
//!
//! ## Submodules
//!
//! - [`aggregator`]: per-channel bpm/metric series built from streamed chunks
//! - [`duration`]: parsing and formatting of interval strings (e.g., "2s", "500ms")
//!
//! ## Data Flow
//!
//! ```text
//! [DataChunk] (stream response)
//!        │
//!        ▼
//! MetricAggregator::ingest()
//!        │
//!        ├──▶ bpm series    (channel -> [MetricPoint])
//!        ├──▶ metric series (channel -> [MetricPoint])
//!        └──▶ current data  (latest chunk set, for live display)
//! ```

pub mod aggregator;
pub mod duration;

pub use aggregator::{IngestError, IngestReport, MetricAggregator, MetricKind};
