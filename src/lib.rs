//! # biomonitor-console
//!
//! Session and streaming state manager for a biomonitoring device console.
//!
//! The console tracks whether a device is attached, manages recording
//! sessions and their annotations, pulls time-windowed physiological data
//! for the active session and keeps per-channel bpm/metric series ready for
//! display. The server does all acquisition and storage; this crate only
//! coordinates requests and holds the resulting state.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                            Console                             │
//! │  ┌──────────────┐ ┌──────────────┐ ┌────────────┐ ┌──────────┐ │
//! │  │ DeviceStatus │ │   Session    │ │   Stream   │ │ History  │ │
//! │  │   Monitor    │ │   Manager    │ │  Ingestor  │ │ Fetcher  │ │
//! │  └──────┬───────┘ └──────┬───────┘ └─────┬──────┘ └────┬─────┘ │
//! │         │  intents ──▶ Navigator ──▶ router            │       │
//! │         ▼                ▼               ▼             ▼       │
//! │  ┌──────────────────────────────────────────────────────────┐  │
//! │  │ ConsoleState (status, active session, MetricAggregator)  │  │
//! │  └──────────────────────────────────────────────────────────┘  │
//! │                             │                                  │
//! │                             ▼                                  │
//! │  ┌──────────────┐                                              │
//! │  │ source       │◀── HttpClient | MemoryClient                 │
//! │  └──────────────┘                                              │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`app`]**: shared [`ConsoleState`], stale-response guards and the
//!   [`Console`] that wires the components together
//! - **[`control`]**: the components that issue requests and update state
//! - **[`data`]**: the [`MetricAggregator`] and duration helpers
//! - **[`source`]**: the [`ResourceClient`] trait with an HTTP and an
//!   in-memory implementation
//! - **[`events`]**: navigation intents for whatever owns routing
//! - **[`config`]**: layered configuration for the binary
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Device status
//! biomonitor-console status
//!
//! # Create a session and start collecting
//! biomonitor-console create --name "Resting"
//! biomonitor-console command session-1 start
//!
//! # Follow the live stream
//! biomonitor-console --endpoint http://10.0.0.5:1492 watch session-1
//! ```
//!
//! ### As a library
//!
//! ```
//! use std::sync::Arc;
//! use biomonitor_console::{Console, MemoryClient, NavigationIntent};
//! use biomonitor_types::{ChannelConfig, DataChunk, NewSession, TimeWindow};
//!
//! # tokio_test::block_on(async {
//! let client = Arc::new(MemoryClient::new());
//! let (console, mut intents) = Console::new(client.clone(), ChannelConfig::default_catalog());
//!
//! let session = console
//!     .sessions
//!     .create_session(NewSession { name: "Resting".into(), ..Default::default() })
//!     .await
//!     .unwrap()
//!     .current()
//!     .unwrap();
//! assert_eq!(intents.try_recv().unwrap(), NavigationIntent::Session(session.id.clone()));
//!
//! client.push_chunks(&session.id, [DataChunk::new(0, TimeWindow::new(0.0, 1.0), 61.0, 0.9)]);
//! console.stream.advance(&session.id, 1.0).await.unwrap();
//! assert_eq!(console.state().lock().metrics().high_water_mark(), Some(1.0));
//! # });
//! ```

pub mod app;
pub mod config;
pub mod control;
pub mod data;
pub mod error;
pub mod events;
pub mod source;

// Re-export main types for convenience
pub use app::{Console, ConsoleState, Generation, LoadOutcome, SharedState};
pub use config::ConsoleConfig;
pub use control::{DeviceStatusMonitor, HistoryFetcher, SessionManager, StreamIngestor};
pub use data::{IngestError, IngestReport, MetricAggregator, MetricKind};
pub use error::ConsoleError;
pub use events::{NavigationIntent, NavigationReceiver, Navigator};
pub use source::{ClientError, HttpClient, HttpClientBuilder, MemoryClient, ResourceClient};
