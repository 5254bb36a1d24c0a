//! Flattened row representation of events and readings

use crate::core::{Event, Reading};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// Per-table insertion sequence number; the ordering and eviction key
pub type Serial = u64;

/// Typed value stored in a column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnValue {
    Str(String),
    Int(i64),
    Bytes(Vec<u8>),
}

impl ColumnValue {
    /// Case-insensitive substring test. `needle` must already be lowercase.
    pub fn contains_lowercase(&self, needle: &str) -> bool {
        match self {
            ColumnValue::Str(s) => s.to_lowercase().contains(needle),
            ColumnValue::Int(i) => i.to_string().contains(needle),
            ColumnValue::Bytes(b) => String::from_utf8_lossy(b).to_lowercase().contains(needle),
        }
    }
}

/// Searchable columns of the two tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    EventId,
    EventDeviceName,
    EventProfileName,
    EventCreated,
    EventOrigin,
    EventTags,
    ReadingId,
    ReadingCreated,
    ReadingOrigin,
    ReadingDeviceName,
    ReadingResourceName,
    ReadingProfileName,
    ReadingValueType,
    ReadingBinaryValue,
    ReadingMediaType,
    ReadingValue,
}

/// Columns searched for event rows
pub const EVENT_COLUMNS: &[Column] = &[
    Column::EventId,
    Column::EventDeviceName,
    Column::EventProfileName,
    Column::EventCreated,
    Column::EventOrigin,
    Column::EventTags,
];

/// Columns searched for reading rows: the parent event's columns come first,
/// so a reading matches whenever its event does.
pub const READING_COLUMNS: &[Column] = &[
    Column::EventId,
    Column::EventDeviceName,
    Column::EventProfileName,
    Column::EventCreated,
    Column::EventOrigin,
    Column::EventTags,
    Column::ReadingId,
    Column::ReadingCreated,
    Column::ReadingOrigin,
    Column::ReadingDeviceName,
    Column::ReadingResourceName,
    Column::ReadingProfileName,
    Column::ReadingValueType,
    Column::ReadingBinaryValue,
    Column::ReadingMediaType,
    Column::ReadingValue,
];

/// A stored record: serial, typed columns and the JSON renderings used for
/// display and decoding.
#[derive(Debug, Clone)]
pub struct Row {
    pub serial: Serial,
    columns: Vec<(Column, ColumnValue)>,
    /// JSON rendering of the whole object (event or reading)
    pub object_json: String,
    /// JSON rendering of the (parent) event's tags
    pub tags_json: String,
}

impl Row {
    /// Flatten an event into an event-table row
    pub fn from_event(event: &Event, serial: Serial) -> Self {
        let tags_json = render_json(&event.tags);
        let mut columns = Vec::with_capacity(EVENT_COLUMNS.len());
        push_event_columns(&mut columns, event, &tags_json);

        Self { serial, columns, object_json: render_json(event), tags_json }
    }

    /// Flatten a reading, denormalizing its parent event's fields into the row
    pub fn from_reading(event: &Event, reading: &Reading, serial: Serial) -> Self {
        let tags_json = render_json(&event.tags);
        let mut columns = Vec::with_capacity(READING_COLUMNS.len());
        push_event_columns(&mut columns, event, &tags_json);

        columns.push((Column::ReadingId, ColumnValue::Str(reading.id.clone())));
        columns.push((Column::ReadingCreated, ColumnValue::Int(reading.created)));
        columns.push((Column::ReadingOrigin, ColumnValue::Int(reading.origin)));
        columns.push((Column::ReadingDeviceName, ColumnValue::Str(reading.device_name.clone())));
        columns
            .push((Column::ReadingResourceName, ColumnValue::Str(reading.resource_name.clone())));
        columns.push((Column::ReadingProfileName, ColumnValue::Str(reading.profile_name.clone())));
        columns.push((Column::ReadingValueType, ColumnValue::Str(reading.value_type.clone())));
        columns
            .push((Column::ReadingBinaryValue, ColumnValue::Bytes(reading.binary_value.clone())));
        columns.push((Column::ReadingMediaType, ColumnValue::Str(reading.media_type.clone())));
        columns.push((Column::ReadingValue, ColumnValue::Str(reading.value.clone())));

        Self { serial, columns, object_json: render_json(reading), tags_json }
    }

    pub fn column(&self, column: Column) -> Option<&ColumnValue> {
        self.columns.iter().find(|(c, _)| *c == column).map(|(_, v)| v)
    }

    /// Union of per-column predicates: true as soon as one of `columns`
    /// contains `needle`.
    pub fn matches(&self, columns: &[Column], needle: &str) -> bool {
        columns
            .iter()
            .any(|c| self.column(*c).map_or(false, |value| value.contains_lowercase(needle)))
    }

    /// Decode the stored JSON rendering back into a domain object
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        match serde_json::from_str(&self.object_json) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(serial = self.serial, error = %e, "failed to decode stored row");
                None
            }
        }
    }
}

fn push_event_columns(columns: &mut Vec<(Column, ColumnValue)>, event: &Event, tags_json: &str) {
    columns.push((Column::EventId, ColumnValue::Str(event.id.clone())));
    columns.push((Column::EventDeviceName, ColumnValue::Str(event.device_name.clone())));
    columns.push((Column::EventProfileName, ColumnValue::Str(event.profile_name.clone())));
    columns.push((Column::EventCreated, ColumnValue::Int(event.created)));
    columns.push((Column::EventOrigin, ColumnValue::Int(event.origin)));
    columns.push((Column::EventTags, ColumnValue::Str(tags_json.to_string())));
}

fn render_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        warn!(error = %e, "failed to render row json");
        String::from("{}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> Event {
        Event::new("evt-1", "Thermostat", "HVAC", 10, 20)
            .with_tag("Site", "Building-A")
            .with_reading(
                Reading::simple("rd-1", "Thermostat", "Temperature", "HVAC", "Float64", "21.5")
                    .with_timestamps(11, 21),
            )
    }

    #[test]
    fn test_event_row_columns() {
        let event = sample_event();
        let row = Row::from_event(&event, 7);

        assert_eq!(row.serial, 7);
        assert_eq!(row.column(Column::EventOrigin), Some(&ColumnValue::Int(20)));
        assert_eq!(row.column(Column::ReadingId), None);
        assert_eq!(row.tags_json, r#"{"Site":"Building-A"}"#);
        assert_eq!(row.decode::<Event>(), Some(event));
    }

    #[test]
    fn test_reading_row_is_denormalized() {
        let event = sample_event();
        let row = Row::from_reading(&event, &event.readings[0], 1);

        assert_eq!(row.column(Column::EventId), Some(&ColumnValue::Str("evt-1".to_string())));
        assert_eq!(row.column(Column::ReadingCreated), Some(&ColumnValue::Int(11)));
        assert_eq!(row.decode::<Reading>(), Some(event.readings[0].clone()));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let event = sample_event();
        let event_row = Row::from_event(&event, 1);
        let reading_row = Row::from_reading(&event, &event.readings[0], 1);

        assert!(event_row.matches(EVENT_COLUMNS, "thermo"));
        assert!(event_row.matches(EVENT_COLUMNS, "building-a"));
        assert!(event_row.matches(EVENT_COLUMNS, "20"));
        // reading fields are not part of the event table
        assert!(!event_row.matches(EVENT_COLUMNS, "temperature"));

        assert!(reading_row.matches(READING_COLUMNS, "temperature"));
        assert!(reading_row.matches(READING_COLUMNS, "hvac"));
        assert!(!reading_row.matches(READING_COLUMNS, "missing"));
    }

    #[test]
    fn test_bytes_and_int_predicates() {
        assert!(ColumnValue::Bytes(b"PNG-Header".to_vec()).contains_lowercase("png"));
        assert!(ColumnValue::Int(1151651).contains_lowercase("5165"));
        assert!(!ColumnValue::Int(-3).contains_lowercase("3-"));
    }
}
