// Flow writer - executable graph back to a configuration tree

//! # Flow Writer
//!
//! Produces the canonical shape of a flow: every node with children is an array
//! of single-field objects, in execution order.
//!
//! ```json
//! [
//!   {"if": [
//!     {"condition": {"type": "field_equals", "field": "car", "value": "volvo"}},
//!     {"then": [{"uppercase": {"field": "firstName"}}]},
//!     {"else": [{"uppercase": {"field": "lastName"}}]}
//!   ]}
//! ]
//! ```
//!
//! Inside a branch the condition comes first, then `then`, then `else` when
//! present. `then` is always written, as `[]` when its body is empty, so the
//! output reads back. Externally-typed nodes are written from the kind and
//! configuration they were built with, which makes `write` after `read`
//! reproduce the document up to its shape.

use serde_json::{Map, Value};

use crate::models::{Branch, Condition, ConditionGroup, Configured, Flow, Predicate, Step};

/// Writes [`Flow`]s as configuration trees
#[derive(Debug, Clone)]
pub struct FlowWriter {
    discriminator: String,
}

impl Default for FlowWriter {
    fn default() -> Self {
        Self::new("type")
    }
}

impl FlowWriter {
    /// `discriminator` is the field naming a condition's type
    pub fn new(discriminator: impl Into<String>) -> Self {
        Self {
            discriminator: discriminator.into(),
        }
    }

    pub fn write<T>(&self, flow: &Flow<T>) -> Value {
        self.write_body(flow.root())
    }

    fn write_body<T>(&self, body: Option<&Step<T>>) -> Value {
        let mut entries = Vec::new();
        if let Some(step) = body {
            self.write_step(step, &mut entries);
        }
        Value::Array(entries)
    }

    /// Nested sequences are written inline
    fn write_step<T>(&self, step: &Step<T>, entries: &mut Vec<Value>) {
        match step {
            Step::Consumer(consumer) => {
                entries.push(field(consumer.kind(), Value::Object(consumer.config().clone())))
            }
            Step::Branch(branch) => entries.push(self.write_branch(branch)),
            Step::Sequence(steps) => {
                for member in steps {
                    self.write_step(member, entries);
                }
            }
        }
    }

    fn write_branch<T>(&self, branch: &Branch<T>) -> Value {
        let mut children = vec![
            self.write_condition(branch.condition()),
            field("then", self.write_body(branch.then_step())),
        ];
        if let Some(otherwise) = branch.else_step() {
            children.push(field("else", self.write_body(Some(otherwise))));
        }
        field(branch.statement().name(), Value::Array(children))
    }

    fn write_condition<T>(&self, condition: &Condition<T>) -> Value {
        match condition {
            Condition::Predicate(predicate) => field("condition", self.write_predicate(predicate)),
            Condition::Group(group) => self.write_group(group),
        }
    }

    fn write_group<T>(&self, group: &ConditionGroup<T>) -> Value {
        let members = group
            .members()
            .iter()
            .map(|member| self.write_condition(member))
            .collect();
        field(group.statement().name(), Value::Array(members))
    }

    /// Discriminator first, then the configuration fields in their original order
    fn write_predicate<T>(&self, predicate: &Configured<dyn Predicate<T>>) -> Value {
        let mut node = Map::new();
        node.insert(self.discriminator.clone(), Value::String(predicate.kind().to_string()));
        for (key, value) in predicate.config() {
            if key != &self.discriminator {
                node.insert(key.clone(), value.clone());
            }
        }
        Value::Object(node)
    }
}

/// A single-field object
fn field(name: &str, value: Value) -> Value {
    let mut node = Map::new();
    node.insert(name.to_string(), value);
    Value::Object(node)
}
