//! Decoding of message bus payloads into domain events

pub mod event_parser;

pub use event_parser::{parse_event, parse_event_str};
