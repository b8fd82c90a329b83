// Built-in condition types

//! Field predicates over JSON payloads. A field that does not resolve, or holds
//! a value of the wrong kind for the comparison, makes the predicate `false`.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::lookup;
use crate::models::Predicate;

/// `field_exists`: the field resolves to any value, `null` included
#[derive(Debug, Clone, Deserialize)]
pub struct FieldExists {
    pub field: String,
}

impl Predicate<Value> for FieldExists {
    fn test(&self, input: &Value) -> anyhow::Result<bool> {
        Ok(lookup(input, &self.field).is_some())
    }
}

/// `field_equals`: the field holds exactly `value`
#[derive(Debug, Clone, Deserialize)]
pub struct FieldEquals {
    pub field: String,
    pub value: Value,
}

impl Predicate<Value> for FieldEquals {
    fn test(&self, input: &Value) -> anyhow::Result<bool> {
        Ok(lookup(input, &self.field) == Some(&self.value))
    }
}

/// `field_greater_than`: the field is a number above `value`
#[derive(Debug, Clone, Deserialize)]
pub struct FieldGreaterThan {
    pub field: String,
    pub value: f64,
}

impl Predicate<Value> for FieldGreaterThan {
    fn test(&self, input: &Value) -> anyhow::Result<bool> {
        let field_value = lookup(input, &self.field).and_then(Value::as_f64);
        Ok(field_value.map_or(false, |v| v > self.value))
    }
}

/// `field_less_than`: the field is a number below `value`
#[derive(Debug, Clone, Deserialize)]
pub struct FieldLessThan {
    pub field: String,
    pub value: f64,
}

impl Predicate<Value> for FieldLessThan {
    fn test(&self, input: &Value) -> anyhow::Result<bool> {
        let field_value = lookup(input, &self.field).and_then(Value::as_f64);
        Ok(field_value.map_or(false, |v| v < self.value))
    }
}

/// `field_contains`: the field is a string containing `substring`
#[derive(Debug, Clone, Deserialize)]
pub struct FieldContains {
    pub field: String,
    pub substring: String,
}

impl Predicate<Value> for FieldContains {
    fn test(&self, input: &Value) -> anyhow::Result<bool> {
        let field_value = lookup(input, &self.field).and_then(Value::as_str);
        Ok(field_value.map_or(false, |v| v.contains(&self.substring)))
    }
}

/// Configuration of [`FieldMatches`] before its pattern is compiled
#[derive(Debug, Clone, Deserialize)]
pub struct FieldMatchesConfig {
    pub field: String,
    pub pattern: String,
}

/// `field_matches`: the field is a string matching the regular expression `pattern`
///
/// The pattern is compiled while the flow is parsed, so an invalid pattern is a
/// configuration error rather than a failure at run time.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "FieldMatchesConfig")]
pub struct FieldMatches {
    pub field: String,
    pub pattern: Regex,
}

impl TryFrom<FieldMatchesConfig> for FieldMatches {
    type Error = regex::Error;

    fn try_from(config: FieldMatchesConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            pattern: Regex::new(&config.pattern)?,
            field: config.field,
        })
    }
}

impl Predicate<Value> for FieldMatches {
    fn test(&self, input: &Value) -> anyhow::Result<bool> {
        let field_value = lookup(input, &self.field).and_then(Value::as_str);
        Ok(field_value.map_or(false, |v| self.pattern.is_match(v)))
    }
}

/// `size_equals`: the payload object has exactly `size` top-level fields
#[derive(Debug, Clone, Deserialize)]
pub struct SizeEquals {
    pub size: usize,
}

impl Predicate<Value> for SizeEquals {
    fn test(&self, input: &Value) -> anyhow::Result<bool> {
        Ok(input.as_object().map_or(false, |fields| fields.len() == self.size))
    }
}

/// `always`: a constant, `true` unless configured otherwise
#[derive(Debug, Clone, Deserialize)]
pub struct Always {
    #[serde(default = "default_true")]
    pub value: bool,
}

fn default_true() -> bool {
    true
}

impl<T> Predicate<T> for Always {
    fn test(&self, _input: &T) -> anyhow::Result<bool> {
        Ok(self.value)
    }
}
