// Built-in consumer types

//! Payload transformations. Each type is named in a flow body by its field
//! name, e.g. `- uppercase: { field: firstName }`.

use serde::Deserialize;
use serde_json::Value;

use super::{assign, check_assign, lookup_mut, object_mut, take};
use crate::models::Consumer;

/// Apply `transform` to a string field; other fields are left as they are
fn map_string(payload: &mut Value, field: &str, transform: impl FnOnce(&str) -> String) -> anyhow::Result<()> {
    object_mut(payload)?;
    if let Some(Value::String(text)) = lookup_mut(payload, field) {
        *text = transform(text.as_str());
    }
    Ok(())
}

/// `uppercase`
#[derive(Debug, Clone, Deserialize)]
pub struct Uppercase {
    pub field: String,
}

impl Consumer<Value> for Uppercase {
    fn accept(&self, input: &mut Value) -> anyhow::Result<()> {
        map_string(input, &self.field, str::to_uppercase)
    }
}

/// `lowercase`
#[derive(Debug, Clone, Deserialize)]
pub struct Lowercase {
    pub field: String,
}

impl Consumer<Value> for Lowercase {
    fn accept(&self, input: &mut Value) -> anyhow::Result<()> {
        map_string(input, &self.field, str::to_lowercase)
    }
}

/// `trim`: strip leading and trailing whitespace
#[derive(Debug, Clone, Deserialize)]
pub struct Trim {
    pub field: String,
}

impl Consumer<Value> for Trim {
    fn accept(&self, input: &mut Value) -> anyhow::Result<()> {
        map_string(input, &self.field, |text| text.trim().to_string())
    }
}

/// `append`: add `suffix` to the end of a string field
#[derive(Debug, Clone, Deserialize)]
pub struct Append {
    pub field: String,
    pub suffix: String,
}

impl Consumer<Value> for Append {
    fn accept(&self, input: &mut Value) -> anyhow::Result<()> {
        map_string(input, &self.field, |text| format!("{}{}", text, self.suffix))
    }
}

/// `set`: write `value`, creating the field (and its parents) when missing
#[derive(Debug, Clone, Deserialize)]
pub struct Set {
    pub field: String,
    #[serde(default)]
    pub value: Value,
}

impl Consumer<Value> for Set {
    fn accept(&self, input: &mut Value) -> anyhow::Result<()> {
        assign(input, &self.field, self.value.clone())
    }
}

/// `remove`
#[derive(Debug, Clone, Deserialize)]
pub struct Remove {
    pub field: String,
}

impl Consumer<Value> for Remove {
    fn accept(&self, input: &mut Value) -> anyhow::Result<()> {
        take(input, &self.field)?;
        Ok(())
    }
}

/// `rename`: move the value at `from` to `to`; nothing happens when `from` is missing
///
/// When `to` cannot be written the value stays at `from`.
#[derive(Debug, Clone, Deserialize)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

impl Consumer<Value> for Rename {
    fn accept(&self, input: &mut Value) -> anyhow::Result<()> {
        let Some(value) = take(input, &self.from)? else {
            return Ok(());
        };
        // Checked after the take: `to` may run through the field being moved
        if let Err(error) = check_assign(input, &self.to) {
            assign(input, &self.from, value)?;
            return Err(error);
        }
        assign(input, &self.to, value)
    }
}
