//! Configuration structures and validators
//!
//! Everything the monitor needs is injected through these structs at
//! construction time; nothing is read from global state.

use crate::error::{MonitorError, Result};
use std::time::Duration;

/// Smallest buffer size accepted from user input
pub const MIN_BUFFER_SIZE: usize = 10;
/// Largest buffer size accepted from user input; also the capacity of the
/// processor's credit queues
pub const MAX_BUFFER_SIZE: usize = 10_000;
/// Buffer size used when nothing else is configured
pub const DEFAULT_BUFFER_SIZE: usize = 50;

/// Default topic the EdgeX core data service publishes events on
pub const DEFAULT_EVENTS_TOPIC: &str = "edgex/events/device/#";

/// Configuration for the processor and the in-memory store
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Maximum number of live rows per table in the store
    pub buffer_size: usize,
    /// Number of events retained by the recency buffer
    pub recent_events: usize,
    /// Trailing window used for the per-second rates
    pub rate_window: Duration,
    /// Cadence at which the rolling sums are sampled into rates
    pub rate_sample_interval: Duration,
    /// Width of a single rolling counter bucket
    pub rate_resolution: Duration,
    /// Capacity of each bounded credit queue
    pub credit_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            recent_events: 5,
            rate_window: Duration::from_secs(60),
            rate_sample_interval: Duration::from_millis(200),
            rate_resolution: Duration::from_millis(100),
            credit_capacity: MAX_BUFFER_SIZE,
        }
    }
}

/// Configuration for the MQTT event source
#[derive(Debug, Clone)]
pub struct MqttSourceConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive_secs: u64,
    pub topic: String,
}

impl Default for MqttSourceConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "datamonitor".to_string(),
            keep_alive_secs: 30,
            topic: DEFAULT_EVENTS_TOPIC.to_string(),
        }
    }
}

impl MqttSourceConfig {
    /// Check the fields a user can type in
    pub fn validate(&self) -> Result<()> {
        validate_not_empty("host", &self.host)?;
        validate_not_empty("topic", &self.topic)?;
        validate_not_empty("client_id", &self.client_id)?;
        if self.port == 0 {
            return Err(MonitorError::Config("port must not be 0".to_string()));
        }
        Ok(())
    }
}

/// Reject buffer sizes outside `[MIN_BUFFER_SIZE, MAX_BUFFER_SIZE]`.
///
/// The store itself accepts any size; this is for the layers that take
/// the value from a user.
pub fn validate_buffer_size(value: usize) -> Result<usize> {
    if (MIN_BUFFER_SIZE..=MAX_BUFFER_SIZE).contains(&value) {
        Ok(value)
    } else {
        Err(MonitorError::InvalidBufferSize { value, min: MIN_BUFFER_SIZE, max: MAX_BUFFER_SIZE })
    }
}

/// Reject empty or whitespace-only values
pub fn validate_not_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MonitorError::Config(format!("{} should not be empty", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_size_bounds() {
        assert!(validate_buffer_size(MIN_BUFFER_SIZE).is_ok());
        assert!(validate_buffer_size(MAX_BUFFER_SIZE).is_ok());
        assert!(validate_buffer_size(DEFAULT_BUFFER_SIZE).is_ok());

        let err = validate_buffer_size(MIN_BUFFER_SIZE - 1).unwrap_err();
        assert!(matches!(err, MonitorError::InvalidBufferSize { value: 9, .. }));
        assert!(validate_buffer_size(MAX_BUFFER_SIZE + 1).is_err());
    }

    #[test]
    fn test_mqtt_config_validation() {
        assert!(MqttSourceConfig::default().validate().is_ok());

        let config = MqttSourceConfig { host: "  ".to_string(), ..Default::default() };
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: host should not be empty");

        let config = MqttSourceConfig { port: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }
}
