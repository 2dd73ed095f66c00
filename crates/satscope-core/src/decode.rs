//! Schema-typed JSON decoding.
//!
//! Bodies are parsed into a `serde_json::Value` once, then walked through
//! [`Node`], which tracks the JSON path of every value it hands out so that a
//! schema violation can be reported as `vin[2].prevout.value` rather than as a
//! byte offset.

use std::str::FromStr;

use serde_json::{Map, Value};
use snafu::ResultExt;

use crate::error::{
    MalformedJson, MalformedText, MissingField, OutOfRange, Result, TypeMismatch, ROOT_PATH,
};

/// A type that can be built from a JSON node.
pub trait FromJson: Sized {
    fn from_json(node: &Node<'_>) -> Result<Self>;
}

impl<T: FromJson> FromJson for Vec<T> {
    fn from_json(node: &Node<'_>) -> Result<Self> {
        node.elements()?.iter().map(T::from_json).collect()
    }
}

impl FromJson for String {
    fn from_json(node: &Node<'_>) -> Result<Self> {
        node.as_str().map(str::to_string)
    }
}

impl FromJson for u64 {
    fn from_json(node: &Node<'_>) -> Result<Self> {
        node.as_u64()
    }
}

/// Decode a JSON response body into `T`.
pub fn decode<T: FromJson>(bytes: &[u8]) -> Result<T> {
    let value: Value = serde_json::from_slice(bytes).context(MalformedJson)?;
    T::from_json(&Node::root(&value))
}

/// Decode a plain-text response body (`/blocks/tip/height`, `/block-height/:h`).
pub fn decode_text<T>(bytes: &[u8]) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let body = String::from_utf8_lossy(bytes);
    let trimmed = body.trim();
    trimmed.parse::<T>().map_err(|e| {
        MalformedText {
            body: trimmed.to_string(),
            reason: e.to_string(),
        }
        .build()
    })
}

/// Decode a plain-text 64 hex character identifier.
pub fn decode_hex_id(bytes: &[u8]) -> Result<String> {
    let body = String::from_utf8_lossy(bytes);
    let trimmed = body.trim();
    if crate::is_hex_id(trimmed) {
        Ok(trimmed.to_ascii_lowercase())
    } else {
        MalformedText {
            body: trimmed.to_string(),
            reason: "expected a 64 character hex identifier".to_string(),
        }
        .fail()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone)]
pub struct Node<'a> {
    value: &'a Value,
    path: String,
}

impl<'a> Node<'a> {
    pub fn root(value: &'a Value) -> Self {
        Self {
            value,
            path: ROOT_PATH.to_string(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn value(&self) -> &'a Value {
        self.value
    }

    fn child_path(&self, key: &str) -> String {
        if self.path == ROOT_PATH {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    fn mismatch<T>(&self, expected: &'static str) -> Result<T> {
        TypeMismatch {
            path: self.path.clone(),
            expected,
            found: type_name(self.value),
        }
        .fail()
    }

    pub fn object(&self) -> Result<&'a Map<String, Value>> {
        match self.value {
            Value::Object(map) => Ok(map),
            _ => self.mismatch("object"),
        }
    }

    /// Child node for `key`; `None` when the key is absent or `null`.
    pub fn field(&self, key: &str) -> Result<Option<Node<'a>>> {
        let map = self.object()?;
        Ok(map.get(key).filter(|v| !v.is_null()).map(|value| Node {
            value,
            path: self.child_path(key),
        }))
    }

    pub fn required(&self, key: &str) -> Result<Node<'a>> {
        match self.field(key)? {
            Some(node) => Ok(node),
            None => MissingField {
                path: self.child_path(key),
            }
            .fail(),
        }
    }

    pub fn elements(&self) -> Result<Vec<Node<'a>>> {
        match self.value {
            Value::Array(items) => Ok(items
                .iter()
                .enumerate()
                .map(|(i, value)| Node {
                    value,
                    path: format!("{}[{}]", self.path, i),
                })
                .collect()),
            _ => self.mismatch("array"),
        }
    }

    pub fn as_str(&self) -> Result<&'a str> {
        match self.value {
            Value::String(s) => Ok(s),
            _ => self.mismatch("string"),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self.value {
            Value::Bool(b) => Ok(*b),
            _ => self.mismatch("boolean"),
        }
    }

    pub fn as_f64(&self) -> Result<f64> {
        match self.value.as_f64() {
            Some(n) => Ok(n),
            None => self.mismatch("number"),
        }
    }

    /// Unsigned integer; integral floats such as `12.0` are accepted.
    pub fn as_u64(&self) -> Result<u64> {
        if let Some(n) = self.value.as_u64() {
            return Ok(n);
        }
        match self.value.as_f64() {
            Some(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => {
                Ok(f as u64)
            }
            Some(f) => OutOfRange {
                path: self.path.clone(),
                reason: format!("{f} is not an unsigned integer"),
            }
            .fail(),
            None => self.mismatch("unsigned integer"),
        }
    }

    pub fn as_u32(&self) -> Result<u32> {
        let n = self.as_u64()?;
        u32::try_from(n).map_err(|_| {
            OutOfRange {
                path: self.path.clone(),
                reason: format!("{n} does not fit in 32 bits"),
            }
            .build()
        })
    }

    pub fn req_str(&self, key: &str) -> Result<String> {
        Ok(self.required(key)?.as_str()?.to_string())
    }

    pub fn req_u64(&self, key: &str) -> Result<u64> {
        self.required(key)?.as_u64()
    }

    pub fn req_f64(&self, key: &str) -> Result<f64> {
        self.required(key)?.as_f64()
    }

    pub fn opt_str(&self, key: &str) -> Result<Option<String>> {
        self.field(key)?
            .map(|n| n.as_str().map(str::to_string))
            .transpose()
    }

    pub fn opt_u64(&self, key: &str) -> Result<Option<u64>> {
        self.field(key)?.map(|n| n.as_u64()).transpose()
    }

    pub fn opt_u32(&self, key: &str) -> Result<Option<u32>> {
        self.field(key)?.map(|n| n.as_u32()).transpose()
    }

    pub fn opt_f64(&self, key: &str) -> Result<Option<f64>> {
        self.field(key)?.map(|n| n.as_f64()).transpose()
    }

    pub fn opt_bool(&self, key: &str) -> Result<Option<bool>> {
        self.field(key)?.map(|n| n.as_bool()).transpose()
    }
}
