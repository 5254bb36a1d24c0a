//! Event ingestion: the processor, its rate windows and the MQTT source

pub mod event_processor;
pub mod mqtt_subscriber;
pub mod rolling_window;

pub use event_processor::{EventListener, EventProcessor, ProcessorState};
pub use mqtt_subscriber::{ConnectionState, MqttSubscriber};
