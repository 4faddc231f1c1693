// ABOUTME: The value type accepted and returned by the store facade.
// ABOUTME: An Entry is either raw text stored verbatim or a JSON document stored serialized.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A stored value. Text is written to the backend verbatim; JSON values are
/// written serialized. A JSON string always becomes `Text`.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Text(String),
    Json(Value),
}

impl Entry {
    /// Build an entry from any serializable value.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(serde_json::to_value(value)?.into())
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Entry::Text(_))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Entry::Text(s) => Some(s),
            Entry::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Entry::Json(v) => Some(v),
            Entry::Text(_) => None,
        }
    }

    /// The string written to the backend for this entry.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        match self {
            Entry::Text(s) => Ok(s.clone()),
            Entry::Json(v) => serde_json::to_string(v),
        }
    }

    /// Convert into a JSON value; text becomes a JSON string.
    pub fn into_value(self) -> Value {
        match self {
            Entry::Text(s) => Value::String(s),
            Entry::Json(v) => v,
        }
    }

    /// Deserialize the entry into `T`.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.into_value())
    }
}

impl From<Value> for Entry {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Entry::Text(s),
            other => Entry::Json(other),
        }
    }
}

impl From<String> for Entry {
    fn from(value: String) -> Self {
        Entry::Text(value)
    }
}

impl From<&str> for Entry {
    fn from(value: &str) -> Self {
        Entry::Text(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn json_strings_become_text() {
        let entry: Entry = json!("world").into();
        assert_eq!(entry, Entry::Text("world".to_string()));
    }

    #[test]
    fn text_encodes_verbatim() {
        let entry = Entry::from(r#"he said "hi""#);
        assert_eq!(entry.as_text(), Some(r#"he said "hi""#));
        assert!(entry.as_json().is_none());
        assert_eq!(entry.encode().unwrap(), r#"he said "hi""#);
    }

    #[test]
    fn json_encodes_serialized() {
        let entry: Entry = json!({"ping": "pong"}).into();
        assert!(!entry.is_text());
        assert!(entry.as_text().is_none());
        assert_eq!(entry.encode().unwrap(), r#"{"ping":"pong"}"#);
    }

    #[test]
    fn from_serialize_and_back() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Prefs {
            theme: String,
            font_size: u32,
        }

        let prefs = Prefs {
            theme: "dark".to_string(),
            font_size: 14,
        };
        let entry = Entry::from_serialize(&prefs).unwrap();
        assert_eq!(entry.as_json().unwrap()["font_size"], json!(14));

        let back: Prefs = entry.deserialize().unwrap();
        assert_eq!(back, prefs);
    }

    #[test]
    fn numbers_and_bools_stay_json() {
        assert_eq!(Entry::from_serialize(&42).unwrap().encode().unwrap(), "42");
        assert_eq!(Entry::from_serialize(&true).unwrap().encode().unwrap(), "true");
        assert_eq!(Entry::from(Value::Null).encode().unwrap(), "null");
    }
}
