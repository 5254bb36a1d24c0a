use crate::core::Event;
use crate::error::{MonitorError, Result};
use serde::Deserialize;

/// Wire envelope published by the core data service: `{"event": {...}}`
#[derive(Debug, Deserialize)]
struct EventEnvelope {
    event: Option<Event>,
}

/// Parse a message bus payload into an Event
pub fn parse_event(payload: &[u8]) -> Result<Event> {
    if payload.iter().all(u8::is_ascii_whitespace) {
        return Err(MonitorError::Parse("Empty payload".to_string()));
    }

    let envelope: EventEnvelope = serde_json::from_slice(payload)?;

    envelope.event.ok_or_else(|| MonitorError::Parse("Payload has no event".to_string()))
}

/// Convenience wrapper for textual payloads
pub fn parse_event_str(payload: &str) -> Result<Event> {
    parse_event(payload.as_bytes())
}
