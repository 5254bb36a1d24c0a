//! Application facade tying the processor and the store together
//!
//! A [`Monitor`] owns one [`EventProcessor`] and one [`Db`], registers the
//! store as a listener and keeps the user's session choices (search text,
//! buffer size, which table is being looked at).

use crate::config::{validate_buffer_size, MonitorConfig};
use crate::core::Event;
use crate::error::Result;
use crate::storage::Db;
use crate::stream::{EventProcessor, ProcessorState};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::info;

/// Which table the user is browsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Events,
    Readings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub data_type: DataType,
    pub search: String,
    pub buffer_size: usize,
}

/// Point-in-time view of counters, rates and store sizes
#[derive(Debug, Clone, Serialize)]
pub struct MonitorStats {
    pub state: String,
    pub total_events: u64,
    pub total_readings: u64,
    pub events_per_second: f64,
    pub readings_per_second: f64,
    pub buffer_size: usize,
    pub filter: String,
    pub live_events: usize,
    pub live_readings: usize,
    pub visible_events: usize,
    pub visible_readings: usize,
    pub matched_events: usize,
    pub matched_readings: usize,
}

pub struct Monitor {
    db: Arc<Db>,
    processor: Arc<EventProcessor>,
    session: RwLock<SessionState>,
}

impl Monitor {
    /// Build the processor over `source` and attach a fresh store to it.
    pub fn new(config: MonitorConfig, source: mpsc::Receiver<Event>) -> Self {
        let db = Arc::new(Db::with_config(&config));
        let session = SessionState {
            data_type: DataType::default(),
            search: String::new(),
            buffer_size: config.buffer_size,
        };

        let processor = Arc::new(EventProcessor::new(config, source));
        processor.attach_listener(db.clone());

        Self { db, processor, session: RwLock::new(session) }
    }

    pub fn db(&self) -> &Arc<Db> {
        &self.db
    }

    pub fn processor(&self) -> &Arc<EventProcessor> {
        &self.processor
    }

    /// Run the ingestion loop until [`stop`](Self::stop) or until the source
    /// closes.
    pub async fn run(&self) -> Result<()> {
        Arc::clone(&self.processor).run().await
    }

    pub fn connect(&self) {
        info!("resuming ingestion");
        self.processor.activate();
    }

    pub fn disconnect(&self) {
        info!("pausing ingestion");
        self.processor.deactivate();
    }

    pub fn stop(&self) {
        self.processor.stop();
    }

    pub fn is_connected(&self) -> bool {
        self.processor.state() == ProcessorState::Running
    }

    /// Apply a new search text to the store
    pub fn set_search(&self, search: &str) {
        self.db.update_filter(search);
        self.session_mut(|session| session.search = search.to_string());
    }

    /// Validate and apply a new buffer size
    pub fn set_buffer_size(&self, buffer_size: usize) -> Result<usize> {
        let buffer_size = validate_buffer_size(buffer_size)?;
        self.db.update_buffer_size(buffer_size);
        self.session_mut(|session| session.buffer_size = buffer_size);
        Ok(buffer_size)
    }

    pub fn set_data_type(&self, data_type: DataType) {
        self.session_mut(|session| session.data_type = data_type);
    }

    pub fn session(&self) -> SessionState {
        self.session.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn stats(&self) -> MonitorStats {
        MonitorStats {
            state: self.processor.state().to_string(),
            total_events: self.processor.total_number_events(),
            total_readings: self.processor.total_number_readings(),
            events_per_second: self.processor.events_per_second_last_minute(),
            readings_per_second: self.processor.readings_per_second_last_minute(),
            buffer_size: self.db.buffer_size(),
            filter: self.db.filter(),
            live_events: self.db.get_total_events_count(),
            live_readings: self.db.get_total_readings_count(),
            visible_events: self.db.get_events_count(),
            visible_readings: self.db.get_readings_count(),
            matched_events: self.db.matched_events_count(),
            matched_readings: self.db.matched_readings_count(),
        }
    }

    fn session_mut(&self, update: impl FnOnce(&mut SessionState)) {
        let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
        update(&mut *session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MIN_BUFFER_SIZE;
    use crate::error::MonitorError;

    fn monitor() -> Monitor {
        let (_tx, rx) = mpsc::channel(1);
        Monitor::new(MonitorConfig::default(), rx)
    }

    #[test]
    fn test_session_tracks_user_choices() {
        let monitor = monitor();
        monitor.set_search("Thermostat");
        monitor.set_data_type(DataType::Readings);
        monitor.set_buffer_size(MIN_BUFFER_SIZE).unwrap();

        let session = monitor.session();
        assert_eq!(session.search, "Thermostat");
        assert_eq!(session.data_type, DataType::Readings);
        assert_eq!(session.buffer_size, MIN_BUFFER_SIZE);
        assert_eq!(monitor.db().filter(), "Thermostat");
        assert_eq!(monitor.db().buffer_size(), MIN_BUFFER_SIZE);
    }

    #[test]
    fn test_invalid_buffer_size_leaves_store_untouched() {
        let monitor = monitor();
        let before = monitor.db().buffer_size();

        let err = monitor.set_buffer_size(0).unwrap_err();
        assert!(matches!(err, MonitorError::InvalidBufferSize { value: 0, .. }));
        assert_eq!(monitor.db().buffer_size(), before);
        assert_eq!(monitor.session().buffer_size, before);
    }

    #[test]
    fn test_connect_and_disconnect() {
        let monitor = monitor();
        assert!(monitor.is_connected());

        monitor.disconnect();
        assert!(!monitor.is_connected());
        assert_eq!(monitor.stats().state, "paused");

        monitor.connect();
        assert!(monitor.is_connected());
    }
}
