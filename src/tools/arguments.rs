//! Parsed tool-call arguments.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::ColloquyError;

/// Key/value arguments of one tool call.
///
/// Values keep their JSON form; string accessors coerce any value to its
/// string representation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments {
    values: Map<String, Value>,
}

impl ToolArguments {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Parse the serialized arguments sent by the remote side.
    ///
    /// Blank input and `null` mean "no arguments". Anything other than a JSON
    /// object is rejected.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        match serde_json::from_str::<Value>(trimmed).map_err(|e| e.to_string())? {
            Value::Object(values) => Ok(Self { values }),
            Value::Null => Ok(Self::default()),
            other => Err(format!("expected a JSON object, got {other}")),
        }
    }

    /// Get the raw JSON map.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get an argument as a string, coercing non-string values.
    pub fn get_str(&self, key: &str) -> Result<String, ColloquyError> {
        self.get_str_opt(key)
            .ok_or_else(|| ColloquyError::InvalidArgument(format!("Missing argument: {key}")))
    }

    /// Get an optional argument as a string.
    pub fn get_str_opt(&self, key: &str) -> Option<String> {
        self.values.get(key).map(coerce_to_string)
    }

    /// Get an integer argument.
    pub fn get_i64(&self, key: &str) -> Result<i64, ColloquyError> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| ColloquyError::InvalidArgument(format!("Missing integer argument: {key}")))?;
        value
            .as_i64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
            .ok_or_else(|| ColloquyError::InvalidArgument(format!("Argument {key} is not an integer")))
    }

    /// Get a boolean argument.
    pub fn get_bool(&self, key: &str) -> Result<bool, ColloquyError> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| ColloquyError::InvalidArgument(format!("Missing boolean argument: {key}")))?;
        value
            .as_bool()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
            .ok_or_else(|| ColloquyError::InvalidArgument(format!("Argument {key} is not a boolean")))
    }

    /// Every argument coerced to its string representation.
    pub fn to_string_map(&self) -> BTreeMap<String, String> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), coerce_to_string(v)))
            .collect()
    }

    /// Deserialize the entire arguments into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, ColloquyError> {
        serde_json::from_value(Value::Object(self.values.clone())).map_err(|e| {
            ColloquyError::InvalidArgument(format!("Failed to deserialize arguments: {e}"))
        })
    }
}

fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
