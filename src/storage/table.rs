use crate::storage::row::{Column, Row, Serial};
use std::collections::{BTreeMap, HashSet};

/// One logical table: live rows ordered by serial.
#[derive(Debug)]
pub struct Table {
    name: &'static str,
    rows: BTreeMap<Serial, Row>,
    last_serial: Serial,
    searchable: &'static [Column],
}

impl Table {
    pub fn new(name: &'static str, searchable: &'static [Column]) -> Self {
        Self { name, rows: BTreeMap::new(), last_serial: 0, searchable }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Allocate the next serial. Serials start at 1 and never repeat.
    pub fn next_serial(&mut self) -> Serial {
        self.last_serial += 1;
        self.last_serial
    }

    pub fn insert(&mut self, row: Row) {
        self.rows.insert(row.serial, row);
    }

    /// Delete every row with `serial <= last_serial - buffer_size` and return
    /// the deleted serials.
    pub fn evict(&mut self, buffer_size: usize) -> Vec<Serial> {
        let threshold = self.last_serial.saturating_sub(buffer_size as u64);
        if threshold == 0 {
            return Vec::new();
        }

        let kept = self.rows.split_off(&(threshold + 1));
        let evicted = std::mem::replace(&mut self.rows, kept);
        evicted.into_keys().collect()
    }

    /// Serials of the rows where any searchable column contains `needle`
    pub fn matching(&self, needle: &str) -> HashSet<Serial> {
        self.rows
            .values()
            .filter(|row| row.matches(self.searchable, needle))
            .map(|row| row.serial)
            .collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }

    pub fn serials(&self) -> impl Iterator<Item = Serial> + '_ {
        self.rows.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
