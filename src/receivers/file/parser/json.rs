// SPDX-License-Identifier: Apache-2.0

use serde_json::Value;

use crate::receivers::file::error::{Error, Result};

/// Validates that a line holds a well-formed JSON object.
#[derive(Debug, Clone, Default)]
pub struct JsonParser;

impl JsonParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse the line, returning the decoded object.
    pub fn validate(&self, line: &str) -> Result<Value> {
        let parsed: Value = serde_json::from_str(line)?;

        if !parsed.is_object() {
            return Err(Error::NotAnObject(kind_of(&parsed)));
        }

        Ok(parsed)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
