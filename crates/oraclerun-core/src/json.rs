//! Ordered JSON object carried between task runs.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::CoreError;

/// A JSON object whose keys keep insertion order.
///
/// Every run result stores its data as one of these. Non-object JSON is
/// normalized on the way in: `null` becomes the empty object and any other
/// scalar or array is stored under the `result` key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct JsonData(Map<String, Value>);

impl JsonData {
    /// Empty document.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Normalize an arbitrary JSON value into a document.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            Value::Null => Self::new(),
            other => {
                let mut map = Map::new();
                map.insert("result".to_string(), other);
                Self(map)
            }
        }
    }

    /// Parse a JSON string into a document.
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let value: Value = serde_json::from_str(input)?;
        Ok(Self::from_value(value))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Serialize `value` and store it under `key`, replacing any previous value.
    pub fn add<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), CoreError> {
        let encoded = serde_json::to_value(value)?;
        self.0.insert(key.to_string(), encoded);
        Ok(())
    }

    /// Insert an already-encoded value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Returns a new document with `other` layered over `self`.
    ///
    /// Top-level keys of `other` win; keys only in `self` keep their position.
    pub fn merge(&self, other: &JsonData) -> JsonData {
        let mut merged = self.clone();
        merged.merge_from(other);
        merged
    }

    /// In-place version of [`JsonData::merge`].
    pub fn merge_from(&mut self, other: &JsonData) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl fmt::Display for JsonData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(s) => f.write_str(&s),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl From<Map<String, Value>> for JsonData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<'de> Deserialize<'de> for JsonData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(value))
    }
}
