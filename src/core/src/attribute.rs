//! Attribute extraction directives
//!
//! An attribute names a value pulled out of a request or response. Exactly
//! one [`AttributeType`] governs which selector fields of the directive are
//! meaningful; dispatch over the closed enum lives in the proxy's extractor.

use crate::error::{CoreError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Where an attribute is extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeSource {
    /// The inbound request (default)
    #[default]
    Request,
    /// The backend response
    Response,
}

/// The kind of extraction an attribute performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// Structured (JSON) payload field, selected by dotted path
    JsonPayload,
    /// Untyped binary (protobuf) payload field, selected by field number
    GrpcPayload,
    /// Query parameter by key
    Query,
    /// Header by key
    Header,
    /// Path-template variable captured during matching
    PathParam,
    /// Static constant
    Constant,
    /// `${name}` template over previously extracted attributes
    Composite,
}

/// A named, typed extraction directive.
#[derive(Debug, Clone, Deserialize)]
pub struct Attribute {
    /// Lookup key (header/query/path param) or JSON field selector
    #[serde(default)]
    pub key: String,
    /// Which extraction this directive performs
    #[serde(rename = "type")]
    pub kind: AttributeType,
    /// Binary payload field position, dotted for nested messages
    #[serde(default)]
    pub index: String,
    /// Dotted field selector for structured payloads; falls back to `key`
    #[serde(default)]
    pub path: String,
    /// Extra parameters for future extraction kinds
    #[serde(default)]
    pub params: Vec<String>,
    /// Request or response side
    #[serde(default)]
    pub source: AttributeSource,
    /// Constant value or composite template
    #[serde(default)]
    pub value: String,
}

/// Substitute `${name}` placeholders with previously extracted attributes.
///
/// Unresolved placeholders remain literal; composition never fails.
pub fn compose(template: &str, attrs: &HashMap<String, Value>) -> String {
    if !template.contains("${") {
        return template.to_string();
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 2..];
        match tail.find('}') {
            Some(close) => {
                let name = &tail[..close];
                match attrs.get(name) {
                    Some(Value::String(s)) => out.push_str(s),
                    Some(other) => out.push_str(&other.to_string()),
                    None => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &tail[close + 1..];
            }
            None => {
                out.push_str("${");
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Normalize an extracted attribute value to a list of strings.
///
/// This is the single coercion routine every consumer goes through: a
/// string, a list of strings, or a generic list whose members are all
/// strings are accepted; `null`/absent coerces to empty; anything else is
/// a typed error.
pub fn coerce_values(value: Option<&Value>) -> Result<Vec<String>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(Value::Array(items)) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => values.push(s.clone()),
                    other => {
                        return Err(CoreError::UnexpectedShape(format!(
                            "list member is not a string: {other}"
                        )))
                    }
                }
            }
            Ok(values)
        }
        Some(other) => Err(CoreError::UnexpectedShape(format!(
            "expected string or list of strings, got {other}"
        ))),
    }
}
