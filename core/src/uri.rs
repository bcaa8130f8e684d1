//! Request URI construction.
//!
//! # Design
//! Every API call is a path plus a query string. The query always opens with
//! `sessionID` (when one applies) and `method`, then the caller's parameters
//! in the order supplied (list and mapping values repeat their key), then `fields` last.
//! All names and values are percent-encoded.

use serde_json::Value;

use crate::error::{Result, WorkfrontError};
use crate::http::HttpMethod;

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    /// Emitted as one `name=value` pair per element, in order.
    Multiple(Vec<String>),
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Single(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Single(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        ParamValue::Single(value.clone())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Single(value.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Single(value.to_string())
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        ParamValue::Single(value.to_string())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::Multiple(values)
    }
}

impl From<&[&str]> for ParamValue {
    fn from(values: &[&str]) -> Self {
        ParamValue::Multiple(values.iter().map(|v| (*v).to_string()).collect())
    }
}

/// Ordered query parameters. Insertion order is preserved on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Converts a JSON object into parameters, keeping key order.
    ///
    /// Strings are used raw, arrays and nested objects become repeated
    /// values (object values in key order), and any other scalar is rendered
    /// as JSON text.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            WorkfrontError::InvalidArgument(format!("expected a JSON object, got {value}"))
        })?;
        Ok(object
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    Value::Array(items) => ParamValue::Multiple(items.iter().map(render).collect()),
                    Value::Object(map) => ParamValue::Multiple(map.values().map(render).collect()),
                    other => ParamValue::Single(render(other)),
                };
                (name.clone(), value)
            })
            .collect())
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Builds `path?query` for one API call.
///
/// `session` is attached as the leading `sessionID` pair when present; the
/// client passes `None` while batching so queued URIs inherit the session of
/// the batch request itself. An empty `fields` slice is treated as absent.
pub fn prepare(
    path: &str,
    params: Option<&Params>,
    fields: Option<&[&str]>,
    method: HttpMethod,
    session: Option<&str>,
) -> Result<String> {
    if path.is_empty() {
        return Err(WorkfrontError::InvalidArgument("request path must not be empty".to_string()));
    }

    let mut pairs: Vec<String> = Vec::new();
    if let Some(id) = session {
        pairs.push(pair("sessionID", id));
    }
    pairs.push(pair("method", method.as_str()));

    for (name, value) in params.into_iter().flat_map(Params::iter) {
        match value {
            ParamValue::Single(v) => pairs.push(pair(name, v)),
            ParamValue::Multiple(values) => pairs.extend(values.iter().map(|v| pair(name, v))),
        }
    }

    if let Some(fields) = fields.filter(|f| !f.is_empty()) {
        pairs.push(pair("fields", &fields.join(",")));
    }

    let separator = if path.starts_with('/') { "" } else { "/" };
    Ok(format!("{separator}{path}?{}", pairs.join("&")))
}

fn pair(name: &str, value: &str) -> String {
    format!("{}={}", urlencoding::encode(name), urlencoding::encode(value))
}
