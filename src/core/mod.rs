//! Core data structures for the data monitor
//!
//! `Event` and `Reading` mirror the EdgeX core-contracts DTOs that travel on
//! the message bus. Field names serialize in camelCase so the JSON rendering
//! matches the wire format. Binary payloads travel as base64 strings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A telemetry envelope produced by a device: metadata plus zero or more readings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub device_name: String,
    #[serde(default)]
    pub profile_name: String,
    #[serde(default)]
    pub created: i64,
    /// Nanoseconds since epoch
    #[serde(default)]
    pub origin: i64,
    #[serde(default)]
    pub readings: Vec<Reading>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// A single measurement nested under an [`Event`].
///
/// Simple readings carry `value`; binary readings carry `binary_value` and
/// `media_type`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub id: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub origin: i64,
    #[serde(default)]
    pub device_name: String,
    #[serde(default)]
    pub resource_name: String,
    #[serde(default)]
    pub profile_name: String,
    #[serde(default)]
    pub value_type: String,
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub binary_value: Vec<u8>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub media_type: String,
    #[serde(default)]
    pub value: String,
}

impl Event {
    pub fn new(id: &str, device_name: &str, profile_name: &str, created: i64, origin: i64) -> Self {
        Self {
            id: id.to_string(),
            device_name: device_name.to_string(),
            profile_name: profile_name.to_string(),
            created,
            origin,
            readings: Vec::new(),
            tags: BTreeMap::new(),
        }
    }

    /// Builder-style helper used by sources and tests
    pub fn with_reading(mut self, reading: Reading) -> Self {
        self.readings.push(reading);
        self
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    pub fn readings_count(&self) -> usize {
        self.readings.len()
    }
}

impl Reading {
    /// Create a simple (string-valued) reading
    pub fn simple(
        id: &str,
        device_name: &str,
        resource_name: &str,
        profile_name: &str,
        value_type: &str,
        value: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            device_name: device_name.to_string(),
            resource_name: resource_name.to_string(),
            profile_name: profile_name.to_string(),
            value_type: value_type.to_string(),
            value: value.to_string(),
            ..Default::default()
        }
    }

    /// Attach a binary payload and its media type
    pub fn with_binary(mut self, binary_value: Vec<u8>, media_type: &str) -> Self {
        self.binary_value = binary_value;
        self.media_type = media_type.to_string();
        self
    }

    pub fn with_timestamps(mut self, created: i64, origin: i64) -> Self {
        self.created = created;
        self.origin = origin;
        self
    }

    pub fn is_binary(&self) -> bool {
        !self.binary_value.is_empty() || !self.media_type.is_empty()
    }
}

/// Standard-alphabet base64 for byte fields. A missing or `null` value
/// decodes to an empty buffer.
mod base64_bytes {
    use base64::{engine::general_purpose, Engine as _};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => general_purpose::STANDARD.decode(encoded).map_err(de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}
