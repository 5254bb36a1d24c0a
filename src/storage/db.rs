//! Bounded in-memory store for events and readings
//!
//! The store keeps two tables, one row per event and one row per reading.
//! Each table holds at most `buffer_size` rows and drops the oldest ones
//! (smallest serial) when it overflows.
//!
//! A single free-text filter can be active. For each table the set of
//! matching serials is recomputed when the filter changes and after every
//! ingest. Queries are restricted to that set while the filter is non-empty.
//!
//! Locking: row storage, serial counters, filter text and buffer size live
//! behind one `RwLock`. Each matched set has its own lock. Lock order is
//! always store first, then matched set.

use crate::config::MonitorConfig;
use crate::core::{Event, Reading};
use crate::error::Result;
use crate::storage::matched::MatchedSet;
use crate::storage::row::{Row, EVENT_COLUMNS, READING_COLUMNS};
use crate::storage::table::Table;
use crate::stream::EventListener;
use serde::de::DeserializeOwned;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread;
use tracing::{debug, info};

struct Store {
    events: Table,
    readings: Table,
    filter: String,
    buffer_size: usize,
}

pub struct Db {
    store: RwLock<Store>,
    matched_events: MatchedSet,
    matched_readings: MatchedSet,
}

impl Db {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            store: RwLock::new(Store {
                events: Table::new("events", EVENT_COLUMNS),
                readings: Table::new("readings", READING_COLUMNS),
                filter: String::new(),
                buffer_size,
            }),
            matched_events: MatchedSet::new(),
            matched_readings: MatchedSet::new(),
        }
    }

    pub fn with_config(config: &MonitorConfig) -> Self {
        Self::new(config.buffer_size)
    }

    /// Insert an event and its readings, then evict overflow and refresh the
    /// matched sets. Returns once both tables are consistent again.
    pub fn ingest(&self, event: &Event) {
        let mut guard = self.write_store();
        let store: &mut Store = &mut guard;

        let event_serial = store.events.next_serial();
        store.events.insert(Row::from_event(event, event_serial));

        for reading in &event.readings {
            let reading_serial = store.readings.next_serial();
            store.readings.insert(Row::from_reading(event, reading, reading_serial));
        }

        debug!(
            event_serial,
            readings = event.readings.len(),
            event_id = %event.id,
            "ingested event"
        );

        self.settle(store, true);
    }

    /// Change the per-table row limit. Shrinking evicts right away.
    pub fn update_buffer_size(&self, buffer_size: usize) {
        let mut guard = self.write_store();
        let store: &mut Store = &mut guard;
        store.buffer_size = buffer_size;

        info!(buffer_size, "buffer size updated");

        self.settle(store, false);
    }

    /// Set the active filter and recompute both matched sets.
    ///
    /// Matching is a case-insensitive substring test over every searchable
    /// column. An empty filter disables filtering and clears the sets.
    pub fn update_filter(&self, filter: &str) {
        let mut guard = self.write_store();
        let store: &mut Store = &mut guard;
        store.filter = filter.to_string();

        let needle = filter.to_lowercase();
        let (events, readings) = (&store.events, &store.readings);
        let (matched_events, matched_readings) = (&self.matched_events, &self.matched_readings);

        thread::scope(|s| {
            s.spawn(|| refilter(events, matched_events, &needle));
            s.spawn(|| refilter(readings, matched_readings, &needle));
        });

        info!(
            filter,
            matched_events = self.matched_events.count(),
            matched_readings = self.matched_readings.count(),
            "filter updated"
        );
    }

    /// Evict overflow on both tables and, when `refresh` is set, recompute
    /// the matched sets. Each table is handled by its own scoped thread.
    fn settle(&self, store: &mut Store, refresh: bool) {
        let buffer_size = store.buffer_size;
        let needle = store.filter.to_lowercase();
        let needle = needle.as_str();
        let Store { events, readings, .. } = store;
        let (matched_events, matched_readings) = (&self.matched_events, &self.matched_readings);

        thread::scope(|s| {
            s.spawn(move || {
                evict(events, matched_events, buffer_size);
                if refresh {
                    refilter(events, matched_events, needle);
                }
            });
            s.spawn(move || {
                evict(readings, matched_readings, buffer_size);
                if refresh {
                    refilter(readings, matched_readings, needle);
                }
            });
        });
    }

    /// Live events, restricted to the matched set while a filter is active
    pub fn get_events(&self) -> Vec<Event> {
        let store = self.read_store();
        collect_rows(&store.events, &self.matched_events, !store.filter.is_empty())
    }

    /// Live readings, restricted to the matched set while a filter is active
    pub fn get_readings(&self) -> Vec<Reading> {
        let store = self.read_store();
        collect_rows(&store.readings, &self.matched_readings, !store.filter.is_empty())
    }

    pub fn get_events_count(&self) -> usize {
        let store = self.read_store();
        if store.filter.is_empty() {
            store.events.len()
        } else {
            self.matched_events.count()
        }
    }

    pub fn get_readings_count(&self) -> usize {
        let store = self.read_store();
        if store.filter.is_empty() {
            store.readings.len()
        } else {
            self.matched_readings.count()
        }
    }

    pub fn get_total_events_count(&self) -> usize {
        self.read_store().events.len()
    }

    pub fn get_total_readings_count(&self) -> usize {
        self.read_store().readings.len()
    }

    pub fn matched_events_count(&self) -> usize {
        self.matched_events.count()
    }

    pub fn matched_readings_count(&self) -> usize {
        self.matched_readings.count()
    }

    pub fn buffer_size(&self) -> usize {
        self.read_store().buffer_size
    }

    pub fn filter(&self) -> String {
        self.read_store().filter.clone()
    }

    /// Serials of the live event rows, oldest first
    pub fn event_serials(&self) -> Vec<u64> {
        self.read_store().events.serials().collect()
    }

    /// Serials of the live reading rows, oldest first
    pub fn reading_serials(&self) -> Vec<u64> {
        self.read_store().readings.serials().collect()
    }

    fn read_store(&self) -> RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_store(&self) -> RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Db {
    fn default() -> Self {
        Self::with_config(&MonitorConfig::default())
    }
}

impl EventListener for Db {
    fn on_event_received(&self, event: &Event) -> Result<()> {
        self.ingest(event);
        Ok(())
    }
}

fn evict(table: &mut Table, matched: &MatchedSet, buffer_size: usize) {
    let evicted = table.evict(buffer_size);
    if !evicted.is_empty() {
        debug!(table = table.name(), count = evicted.len(), "evicted rows");
        matched.remove_all(&evicted);
    }
}

fn refilter(table: &Table, matched: &MatchedSet, needle: &str) {
    if needle.is_empty() {
        matched.clear();
        return;
    }
    let serials = table.matching(needle);
    debug!(table = table.name(), matched = serials.len(), "recomputed matches");
    matched.replace(serials);
}

fn collect_rows<T: DeserializeOwned>(table: &Table, matched: &MatchedSet, filtered: bool) -> Vec<T> {
    if !filtered {
        return table.rows().filter_map(Row::decode).collect();
    }
    let matched = matched.read();
    table.rows().filter(|row| matched.contains(&row.serial)).filter_map(Row::decode).collect()
}
