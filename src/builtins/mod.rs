// Built-in conditions and consumers over JSON payloads

//! # Built-in Library
//!
//! Default condition and consumer types for flows over `serde_json::Value`
//! payloads. [`crate::FlowEngine::with_builtins`] registers all of them.
//!
//! ## Field Paths
//!
//! Every `field` setting may be a dotted path (`customer.address.city`) walked
//! through nested objects. Reading a path that does not resolve yields nothing;
//! conditions treat that as `false`. Writing a path creates the missing
//! intermediate objects.
//!
//! ## Payload Shape
//!
//! Consumers require an object payload and fail the run otherwise. String
//! transforms (`uppercase`, `lowercase`, `trim`, `append`) leave missing and
//! non-string fields alone.

use anyhow::{anyhow, bail};
use serde_json::{Map, Value};

use crate::engine::registry::{ConditionRegistry, ConsumerRegistry};
use crate::Result;

// Contains FieldExists, FieldEquals, FieldMatches, SizeEquals, ...
pub mod conditions;

// Contains Uppercase, Set, Rename, Append, ...
pub mod consumers;

pub use conditions::{
    Always, FieldContains, FieldEquals, FieldExists, FieldGreaterThan, FieldLessThan,
    FieldMatches, SizeEquals,
};
pub use consumers::{Append, Lowercase, Remove, Rename, Set, Trim, Uppercase};

/// Every built-in condition type, keyed by its `type` discriminator
pub fn condition_registry() -> Result<ConditionRegistry<Value>> {
    let mut registry = ConditionRegistry::conditions();
    registry
        .register::<FieldExists>("field_exists")?
        .register::<FieldEquals>("field_equals")?
        .register::<FieldGreaterThan>("field_greater_than")?
        .register::<FieldLessThan>("field_less_than")?
        .register::<FieldContains>("field_contains")?
        .register::<FieldMatches>("field_matches")?
        .register::<SizeEquals>("size_equals")?
        .register::<Always>("always")?;
    Ok(registry)
}

/// Every built-in consumer type, keyed by its field name
pub fn consumer_registry() -> Result<ConsumerRegistry<Value>> {
    let mut registry = ConsumerRegistry::consumers();
    registry
        .register::<Uppercase>("uppercase")?
        .register::<Lowercase>("lowercase")?
        .register::<Trim>("trim")?
        .register::<Set>("set")?
        .register::<Remove>("remove")?
        .register::<Rename>("rename")?
        .register::<Append>("append")?;
    Ok(registry)
}

/// Resolve a dotted path
pub fn lookup<'v>(payload: &'v Value, field: &str) -> Option<&'v Value> {
    field
        .split('.')
        .try_fold(payload, |node, segment| node.as_object()?.get(segment))
}

/// Resolve a dotted path for modification
pub fn lookup_mut<'v>(payload: &'v mut Value, field: &str) -> Option<&'v mut Value> {
    field
        .split('.')
        .try_fold(payload, |node, segment| node.as_object_mut()?.get_mut(segment))
}

/// Set the value at a dotted path, creating intermediate objects
pub fn assign(payload: &mut Value, field: &str, value: Value) -> anyhow::Result<()> {
    let (parents, leaf) = split_leaf(field);
    let mut node = object_mut(payload)?;
    for segment in parents {
        let child = node
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        node = child
            .as_object_mut()
            .ok_or_else(|| anyhow!("cannot set '{}': '{}' is not an object", field, segment))?;
    }
    node.insert(leaf.to_string(), value);
    Ok(())
}

/// Fail where [`assign`] would fail, without changing the payload
pub fn check_assign(payload: &Value, field: &str) -> anyhow::Result<()> {
    let (parents, _) = split_leaf(field);
    let mut node = match payload {
        Value::Object(fields) => fields,
        other => bail!("expected an object payload, found {}", kind_of(other)),
    };
    for segment in parents {
        match node.get(segment) {
            None => return Ok(()),
            Some(Value::Object(child)) => node = child,
            Some(_) => bail!("cannot set '{}': '{}' is not an object", field, segment),
        }
    }
    Ok(())
}

/// Remove and return the value at a dotted path
pub fn take(payload: &mut Value, field: &str) -> anyhow::Result<Option<Value>> {
    let (parents, leaf) = split_leaf(field);
    let mut node = object_mut(payload)?;
    for segment in parents {
        match node.get_mut(segment).and_then(Value::as_object_mut) {
            Some(child) => node = child,
            None => return Ok(None),
        }
    }
    Ok(node.remove(leaf))
}

/// The payload as an object, or an evaluation error
pub fn object_mut(payload: &mut Value) -> anyhow::Result<&mut Map<String, Value>> {
    match payload {
        Value::Object(fields) => Ok(fields),
        other => bail!("expected an object payload, found {}", kind_of(other)),
    }
}

fn split_leaf(field: &str) -> (impl Iterator<Item = &str>, &str) {
    let (parents, leaf) = match field.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, field),
    };
    (parents.into_iter().flat_map(|p| p.split('.')), leaf)
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
