//! HTTP API module for the data monitor
//!
//! Provides REST endpoints for:
//! - Live counters and rates
//! - Browsing the buffered events and readings
//! - Search, buffer size and pause/resume control

pub mod server;

pub use server::{
    create_server, start_server, AppState, BufferSizeRequest, ErrorResponse, FilterRequest,
    SuccessResponse,
};
