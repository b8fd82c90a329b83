// Flow document formats

//! Flow documents are loaded into a `serde_json::Value` tree whatever their
//! on-disk format, so the reader and writer only ever see one representation.
//! JSON and YAML are supported; object field order is preserved in both.
//!
//! Neither format forbids an object from repeating a field, and a flow written
//! in the object shape can legitimately do so (two consumers of the same type in
//! one `then`). An object with a repeated field is therefore loaded as the
//! equivalent array of single-field objects, one per field in document order,
//! and the reader applies its usual structural checks to every occurrence.

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::{FlowError, Result};

/// Serialization format of a flow document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowFormat {
    Json,
    Yaml,
}

impl FlowFormat {
    /// Pick the format from a file extension (`.json`, `.yaml`, `.yml`)
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "json" => Ok(FlowFormat::Json),
            "yaml" | "yml" => Ok(FlowFormat::Yaml),
            _ => Err(FlowError::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FlowFormat::Json => "json",
            FlowFormat::Yaml => "yaml",
        }
    }

    /// Parse a document into a configuration tree
    pub fn parse(self, text: &str) -> Result<Value> {
        let Document(value) = match self {
            FlowFormat::Json => serde_json::from_str(text)?,
            FlowFormat::Yaml => serde_yaml::from_str(text)?,
        };
        Ok(value)
    }

    /// Render a configuration tree
    pub fn render(self, value: &Value) -> Result<String> {
        match self {
            FlowFormat::Json => Ok(serde_json::to_string_pretty(value)?),
            FlowFormat::Yaml => Ok(serde_yaml::to_string(value)?),
        }
    }
}

impl fmt::Display for FlowFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FlowFormat {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(FlowFormat::Json),
            "yaml" | "yml" => Ok(FlowFormat::Yaml),
            other => Err(FlowError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// A configuration tree that keeps every occurrence of a repeated field
struct Document(Value);

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DocumentVisitor).map(Document)
    }
}

struct DocumentVisitor;

impl<'de> Visitor<'de> for DocumentVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a flow document")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Value, E> {
        Ok(Number::from_f64(v).map_or(Value::Null, Value::Number))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Value, E> {
        Ok(Value::String(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(Document(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Value, A::Error> {
        let mut fields: Vec<(String, Value)> = Vec::new();
        while let Some((key, Document(value))) = map.next_entry::<String, Document>()? {
            fields.push((key, value));
        }

        let repeated = fields
            .iter()
            .enumerate()
            .any(|(index, (key, _))| fields[..index].iter().any(|(seen, _)| seen == key));
        if !repeated {
            return Ok(Value::Object(fields.into_iter().collect()));
        }
        Ok(Value::Array(
            fields
                .into_iter()
                .map(|(key, value)| Value::Object(Map::from_iter([(key, value)])))
                .collect(),
        ))
    }
}
