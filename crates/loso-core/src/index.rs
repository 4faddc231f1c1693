// ABOUTME: The side-car index record mapping every tracked key to its metadata.
// ABOUTME: Handles the persisted JSON shape and the validity checks used to decide when to reset it.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved backend key holding the serialized index record.
pub const CONFIG_NAME: &str = "loso_config";

/// Format version written into every fresh index record. Stored for
/// reference only; it is never compared on read.
pub const INDEX_FORMAT_VERSION: &str = "0.0.1";

/// When a key was last written: an ISO-8601 string, or epoch milliseconds
/// as found in some older records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UpdatedTime {
    Iso(String),
    Millis(i64),
}

impl Default for UpdatedTime {
    fn default() -> Self {
        UpdatedTime::Iso(String::new())
    }
}

impl fmt::Display for UpdatedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdatedTime::Iso(s) => f.write_str(s),
            UpdatedTime::Millis(ms) => write!(f, "{}", ms),
        }
    }
}

/// Per-key bookkeeping: the schema version active at the last write, when
/// that write happened, and how the value is encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    pub version: String,
    pub updated_time: UpdatedTime,
    pub string_type: bool,
}

impl Metadata {
    /// Metadata for a write happening now under `version`.
    pub fn now(version: &str, string_type: bool) -> Self {
        Self {
            version: version.to_string(),
            updated_time: UpdatedTime::Iso(format_timestamp(Utc::now())),
            string_type,
        }
    }

    /// Parse `updated_time`. Returns `None` for strings that are not
    /// RFC 3339 and for out-of-range millisecond values.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        match &self.updated_time {
            UpdatedTime::Iso(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            UpdatedTime::Millis(ms) => DateTime::from_timestamp_millis(*ms),
        }
    }
}

/// ISO-8601 UTC with millisecond precision and a `Z` suffix.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The index of all tracked keys, persisted under [`CONFIG_NAME`].
///
/// The top-level `version` is kept as whatever JSON was read, since it is
/// never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexRecord {
    #[serde(skip_serializing_if = "Value::is_null")]
    pub version: Value,
    pub configs: BTreeMap<String, Metadata>,
}

impl Default for IndexRecord {
    fn default() -> Self {
        Self {
            version: Value::String(INDEX_FORMAT_VERSION.to_string()),
            configs: BTreeMap::new(),
        }
    }
}

impl IndexRecord {
    /// A fresh, empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw index record. Returns `None` when the text is not JSON,
    /// is not an object, or its `configs` field is not an object; callers
    /// replace such records with a fresh one.
    ///
    /// Entries of `configs` are decoded one by one. An entry that does not
    /// decode as [`Metadata`] is dropped and its key is treated as untracked;
    /// the rest of the record is kept.
    pub fn parse(raw: &str) -> Option<Self> {
        let Value::Object(mut obj) = serde_json::from_str::<Value>(raw).ok()? else {
            return None;
        };
        let Some(Value::Object(raw_configs)) = obj.remove("configs") else {
            return None;
        };
        let version = obj.remove("version").unwrap_or(Value::Null);

        let configs = raw_configs
            .into_iter()
            .filter_map(|(key, entry)| match serde_json::from_value::<Metadata>(entry) {
                Ok(meta) => Some((key, meta)),
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "dropping malformed index entry");
                    None
                }
            })
            .collect();

        Some(Self { version, configs })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn get(&self, key: &str) -> Option<&Metadata> {
        self.configs.get(key)
    }

    pub fn insert(&mut self, key: &str, meta: Metadata) {
        self.configs.insert(key.to_string(), meta);
    }

    pub fn remove(&mut self, key: &str) -> Option<Metadata> {
        self.configs.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().map(String::as_str)
    }
}
