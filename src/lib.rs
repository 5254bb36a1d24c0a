//! # Data Monitor
//!
//! Data Monitor is the data plane of a live telemetry dashboard for EdgeX
//! deployments. It ingests the stream of events (each carrying nested
//! readings) published on the message bus, keeps a bounded recent history
//! in memory, computes live throughput rates and supports interactive
//! free-text filtering over the buffered history.
//!
//! ## Features
//!
//! - Pausable ingestion pipeline with backpressure and rolling per-second rates
//! - Dual-table in-memory store with FIFO eviction and live filtering
//! - MQTT source and an HTTP read/control API
//!
//! ## Example
//!
//! ```rust
//! use datamonitor::{core::Event, storage::Db};
//!
//! let db = Db::new(10);
//! db.ingest(&Event::new("evt-1", "Thermostat", "HVAC", 0, 0));
//! db.update_filter("thermo");
//! assert_eq!(db.get_events_count(), 1);
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::new_without_default)]
#![allow(clippy::unnecessary_map_or)]

/// Core data structures and types
pub mod core;

/// Configuration structures and validators
pub mod config;

pub mod error;

/// Tracing subscriber setup for binaries
pub mod logging;

/// Decoding of message bus payloads
pub mod parsing;

pub mod storage;

pub mod stream;

pub mod monitor;

pub mod http;

// Re-export commonly used types
pub use error::{MonitorError as Error, Result};
