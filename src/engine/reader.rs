// Flow reader - configuration tree to executable graph

//! # Flow Reader
//!
//! Recursive descent over a configuration tree, one function per grammar
//! position:
//!
//! ```text
//! read_body       root / then / else   → if, ifNot, consumers
//! read_branch     if / ifNot           → one condition, then, optional else
//! read_condition  condition / allOf / anyOf
//! read_group      allOf / anyOf        → condition, allOf, anyOf
//! ```
//!
//! ## Node Shapes
//!
//! Every node with children is read as "for each child object, for each field
//! of that object", in document order. The canonical shape is an array of
//! single-field objects, the only shape that can repeat a name (two consumers of
//! the same type, two `condition`s in a group):
//!
//! ```yaml
//! - if:
//!     - allOf:
//!         - condition: { type: field_equals, field: car, value: volvo }
//!         - condition: { type: size_equals, size: 3 }
//!     - then:
//!         - uppercase: { field: firstName }
//! ```
//!
//! A single object whose fields are the children is also accepted unless
//! `FlowSettings::accept_object_shape` is off. `null` reads as no children.
//!
//! ## Errors
//!
//! Parsing stops at the first problem. Errors name the offending tag and carry
//! the node's path (`$[0].if[1].then[0]`). Nesting of branches and groups is
//! bounded by `FlowSettings::max_depth`.

use serde_json::{Map, Value};
use tracing::debug;

use super::registry::{ConditionRegistry, ConsumerRegistry};
use super::settings::FlowSettings;
use crate::models::{Branch, Condition, ConditionGroup, Configured, Consumer, Flow, Predicate, Statement, Step};
use crate::{FlowError, Result};

const ROOT: &str = "root";

/// One child field of a node, in document order
struct Child<'v> {
    name: &'v str,
    value: &'v Value,
    path: String,
}

/// Reads configuration trees into [`Flow`]s
pub struct FlowReader<'a, T> {
    conditions: &'a ConditionRegistry<T>,
    consumers: &'a ConsumerRegistry<T>,
    settings: &'a FlowSettings,
}

impl<'a, T: 'static> FlowReader<'a, T> {
    pub fn new(
        conditions: &'a ConditionRegistry<T>,
        consumers: &'a ConsumerRegistry<T>,
        settings: &'a FlowSettings,
    ) -> Self {
        Self {
            conditions,
            consumers,
            settings,
        }
    }

    /// Read a whole document; its top level is a body
    pub fn read(&self, document: &Value) -> Result<Flow<T>> {
        let root = self.read_body(document, ROOT, "$", 0)?;
        Ok(Flow::new(root))
    }

    /// Body of the root, a `then` or an `else`
    fn read_body(&self, node: &Value, parent: &str, path: &str, depth: usize) -> Result<Option<Step<T>>> {
        let mut steps = Vec::new();
        for child in self.children(node, path)? {
            match Statement::lookup(child.name) {
                Some(statement) if statement.is_branch() => {
                    let branch = self.read_branch(statement, child.value, &child.path, depth)?;
                    steps.push(Step::Branch(Box::new(branch)));
                }
                Some(statement) => {
                    return Err(FlowError::MisplacedStatement {
                        name: statement.name().to_string(),
                        parent: parent.to_string(),
                        path: child.path,
                    });
                }
                None => {
                    let consumer = self.read_consumer(child.name, child.value, &child.path)?;
                    steps.push(Step::Consumer(consumer));
                }
            }
        }
        Ok(Step::compose(steps))
    }

    fn read_branch(&self, statement: Statement, node: &Value, path: &str, depth: usize) -> Result<Branch<T>> {
        let depth = self.descend(depth, path)?;
        let parent = statement.name();

        let mut condition: Option<Condition<T>> = None;
        let mut then: Option<Option<Step<T>>> = None;
        let mut otherwise: Option<Option<Step<T>>> = None;

        for child in self.children(node, path)? {
            let kind = Statement::lookup(child.name).filter(|kind| statement.permitted_children().contains(kind));
            match kind {
                Some(kind) if kind.is_condition() => {
                    if condition.is_some() {
                        return Err(FlowError::DuplicateCondition {
                            name: child.name.to_string(),
                            parent: parent.to_string(),
                            path: child.path,
                        });
                    }
                    condition = Some(self.read_condition(kind, child.value, &child.path, depth)?);
                }
                Some(kind) => {
                    let slot = if kind == Statement::Then {
                        &mut then
                    } else {
                        &mut otherwise
                    };
                    if slot.is_some() {
                        return Err(FlowError::DuplicateStatement {
                            name: child.name.to_string(),
                            parent: parent.to_string(),
                            path: child.path,
                        });
                    }
                    *slot = Some(self.read_body(child.value, kind.name(), &child.path, depth)?);
                }
                None => {
                    return Err(FlowError::UnexpectedStatement {
                        name: child.name.to_string(),
                        parent: parent.to_string(),
                        path: child.path,
                    });
                }
            }
        }

        let condition = condition.ok_or_else(|| FlowError::MissingCondition {
            parent: parent.to_string(),
            path: path.to_string(),
        })?;
        let then = then.ok_or_else(|| FlowError::MissingThen {
            parent: parent.to_string(),
            path: path.to_string(),
        })?;

        debug!(statement = parent, path, "read branch");
        match statement {
            Statement::IfNot => Ok(Branch::negated(condition, then, otherwise.flatten())),
            _ => Ok(Branch::new(condition, then, otherwise.flatten())),
        }
    }

    /// `condition`, `allOf` or `anyOf`
    fn read_condition(&self, statement: Statement, node: &Value, path: &str, depth: usize) -> Result<Condition<T>> {
        match statement {
            Statement::AllOf | Statement::AnyOf => {
                Ok(Condition::Group(self.read_group(statement, node, path, depth)?))
            }
            _ => Ok(Condition::Predicate(self.read_predicate(node, path)?)),
        }
    }

    fn read_group(&self, statement: Statement, node: &Value, path: &str, depth: usize) -> Result<ConditionGroup<T>> {
        let depth = self.descend(depth, path)?;

        let mut members = Vec::new();
        for child in self.children(node, path)? {
            match Statement::lookup(child.name) {
                Some(kind) if statement.permitted_children().contains(&kind) => {
                    members.push(self.read_condition(kind, child.value, &child.path, depth)?);
                }
                _ => {
                    return Err(FlowError::UnexpectedStatement {
                        name: child.name.to_string(),
                        parent: statement.name().to_string(),
                        path: child.path,
                    });
                }
            }
        }

        debug!(statement = statement.name(), path, members = members.len(), "read group");
        if statement == Statement::AnyOf {
            Ok(ConditionGroup::any_of(members))
        } else {
            Ok(ConditionGroup::all_of(members))
        }
    }

    /// `condition`: the discriminator field names the type, the rest configures it
    fn read_predicate(&self, node: &Value, path: &str) -> Result<Configured<dyn Predicate<T>>> {
        let Value::Object(fields) = node else {
            return Err(invalid_node(path, "object", node));
        };

        let discriminator = self.settings.discriminator.as_str();
        let kind = fields
            .get(discriminator)
            .and_then(Value::as_str)
            .ok_or_else(|| FlowError::MissingDiscriminator {
                field: discriminator.to_string(),
                path: path.to_string(),
            })?;

        let config: Map<String, Value> = fields
            .iter()
            .filter(|(key, _)| key.as_str() != discriminator)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        self.conditions.build(kind, config, path)
    }

    /// A non-statement field of a body: the name is the type, the value its configuration
    fn read_consumer(&self, kind: &str, node: &Value, path: &str) -> Result<Configured<dyn Consumer<T>>> {
        let config = match node {
            Value::Null => Map::new(),
            Value::Object(fields) => fields.clone(),
            other => return Err(invalid_node(path, "object or null", other)),
        };
        self.consumers.build(kind, config, path)
    }

    /// Normalise a node to its child fields in document order
    fn children<'v>(&self, node: &'v Value, path: &str) -> Result<Vec<Child<'v>>> {
        match node {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => {
                let mut children = Vec::new();
                for (index, item) in items.iter().enumerate() {
                    let item_path = format!("{}[{}]", path, index);
                    let Value::Object(fields) = item else {
                        return Err(invalid_node(&item_path, "object", item));
                    };
                    children.extend(fields.iter().map(|(name, value)| Child {
                        name,
                        value,
                        path: format!("{}.{}", item_path, name),
                    }));
                }
                Ok(children)
            }
            Value::Object(fields) if self.settings.accept_object_shape => {
                debug!(path, "reading object-shaped node");
                Ok(fields
                    .iter()
                    .map(|(name, value)| Child {
                        name,
                        value,
                        path: format!("{}.{}", path, name),
                    })
                    .collect())
            }
            other => Err(invalid_node(path, "array of objects", other)),
        }
    }

    fn descend(&self, depth: usize, path: &str) -> Result<usize> {
        let depth = depth + 1;
        if depth > self.settings.max_depth {
            return Err(FlowError::TooDeep {
                path: path.to_string(),
                max_depth: self.settings.max_depth,
            });
        }
        Ok(depth)
    }
}

fn invalid_node(path: &str, expected: &str, found: &Value) -> FlowError {
    let found = match found {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    FlowError::InvalidNode {
        path: path.to_string(),
        expected: expected.to_string(),
        found: found.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{consumer_fn, predicate_fn};
    use serde_json::json;
    use std::sync::Arc;

    struct Fixture {
        conditions: ConditionRegistry<Vec<String>>,
        consumers: ConsumerRegistry<Vec<String>>,
        settings: FlowSettings,
    }

    impl Fixture {
        fn new() -> Self {
            let mut conditions = ConditionRegistry::<Vec<String>>::conditions();
            conditions
                .register_factory("always", |config| {
                    let value = config.get("value").and_then(Value::as_bool).unwrap_or(true);
                    Ok(Arc::new(predicate_fn(move |_: &Vec<String>| Ok(value))) as Arc<dyn Predicate<Vec<String>>>)
                })
                .unwrap();

            let mut consumers = ConsumerRegistry::<Vec<String>>::consumers();
            consumers
                .register_factory("log", |config| {
                    let tag = config
                        .get("tag")
                        .and_then(Value::as_str)
                        .unwrap_or("log")
                        .to_string();
                    Ok(Arc::new(consumer_fn(move |log: &mut Vec<String>| {
                        log.push(tag.clone());
                        Ok(())
                    })) as Arc<dyn Consumer<Vec<String>>>)
                })
                .unwrap();

            Self {
                conditions,
                consumers,
                settings: FlowSettings::default(),
            }
        }

        fn read(&self, document: Value) -> Result<Flow<Vec<String>>> {
            FlowReader::new(&self.conditions, &self.consumers, &self.settings).read(&document)
        }

        fn run(&self, document: Value) -> Vec<String> {
            let flow = self.read(document).unwrap();
            let mut log = Vec::new();
            flow.run(&mut log).unwrap();
            log
        }
    }

    #[test]
    fn test_root_composition() {
        let fixture = Fixture::new();
        assert!(fixture.read(json!([])).unwrap().is_empty());
        assert!(fixture.read(Value::Null).unwrap().is_empty());

        let single = fixture.read(json!([{"log": {"tag": "a"}}])).unwrap();
        assert!(matches!(single.root(), Some(Step::Consumer(_))));

        let many = fixture
            .read(json!([{"log": {"tag": "a"}}, {"log": {"tag": "b"}}]))
            .unwrap();
        assert!(matches!(many.root(), Some(Step::Sequence(steps)) if steps.len() == 2));
    }

    #[test]
    fn test_if_then_else() {
        let fixture = Fixture::new();
        let flow = |value: bool| {
            json!([{"if": [
                {"condition": {"type": "always", "value": value}},
                {"then": [{"log": {"tag": "then"}}]},
                {"else": [{"log": {"tag": "else"}}]}
            ]}])
        };
        assert_eq!(fixture.run(flow(true)), vec!["then"]);
        assert_eq!(fixture.run(flow(false)), vec!["else"]);
    }

    #[test]
    fn test_object_shape_is_accepted() {
        let fixture = Fixture::new();
        let log = fixture.run(json!({
            "ifNot": {
                "condition": {"type": "always", "value": false},
                "then": {"log": {"tag": "negated"}}
            }
        }));
        assert_eq!(log, vec!["negated"]);
    }

    #[test]
    fn test_object_shape_can_be_disabled() {
        let mut fixture = Fixture::new();
        fixture.settings = FlowSettings::default().with_object_shape(false);
        let err = fixture.read(json!({"log": {}})).unwrap_err();
        assert!(matches!(err, FlowError::InvalidNode { .. }));
    }

    #[test]
    fn test_group_accepts_both_shapes() {
        let fixture = Fixture::new();
        let canonical = json!([{"if": [
            {"anyOf": [
                {"condition": {"type": "always", "value": false}},
                {"condition": {"type": "always", "value": true}}
            ]},
            {"then": [{"log": {"tag": "any"}}]}
        ]}]);
        let shim = json!([{"if": [
            {"anyOf": {
                "condition": {"type": "always", "value": true},
                "allOf": []
            }},
            {"then": [{"log": {"tag": "any"}}]}
        ]}]);
        assert_eq!(fixture.run(canonical), vec!["any"]);
        assert_eq!(fixture.run(shim), vec!["any"]);
    }

    #[test]
    fn test_empty_groups() {
        let fixture = Fixture::new();
        let flow = |group: &str| {
            json!([{"if": [
                {group: null},
                {"then": [{"log": {"tag": "then"}}]},
                {"else": [{"log": {"tag": "else"}}]}
            ]}])
        };
        assert_eq!(fixture.run(flow("allOf")), vec!["then"]);
        assert_eq!(fixture.run(flow("anyOf")), vec!["else"]);
    }

    #[test]
    fn test_duplicate_condition_of_any_form() {
        let fixture = Fixture::new();
        let err = fixture
            .read(json!([{"if": [
                {"condition": {"type": "always"}},
                {"allOf": []},
                {"then": []}
            ]}]))
            .unwrap_err();
        match err {
            FlowError::DuplicateCondition { name, parent, path } => {
                assert_eq!(name, "allOf");
                assert_eq!(parent, "if");
                assert_eq!(path, "$[0].if[1].allOf");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_then_and_else() {
        let fixture = Fixture::new();
        let err = fixture
            .read(json!([{"if": [
                {"condition": {"type": "always"}},
                {"then": []},
                {"then": []}
            ]}]))
            .unwrap_err();
        assert!(matches!(err, FlowError::DuplicateStatement { ref name, .. } if name == "then"));

        let err = fixture
            .read(json!([{"if": [
                {"condition": {"type": "always"}},
                {"then": []},
                {"else": []},
                {"else": []}
            ]}]))
            .unwrap_err();
        assert!(matches!(err, FlowError::DuplicateStatement { ref name, .. } if name == "else"));
    }

    #[test]
    fn test_missing_condition_and_then() {
        let fixture = Fixture::new();
        let err = fixture.read(json!([{"if": [{"then": []}]}])).unwrap_err();
        assert!(matches!(err, FlowError::MissingCondition { .. }));

        let err = fixture
            .read(json!([{"ifNot": [{"condition": {"type": "always"}}]}]))
            .unwrap_err();
        match err {
            FlowError::MissingThen { parent, path } => {
                assert_eq!(parent, "ifNot");
                assert_eq!(path, "$[0].ifNot");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unexpected_children() {
        let fixture = Fixture::new();
        let err = fixture
            .read(json!([{"if": [
                {"condition": {"type": "always"}},
                {"then": []},
                {"log": {}}
            ]}]))
            .unwrap_err();
        assert!(matches!(err, FlowError::UnexpectedStatement { ref name, .. } if name == "log"));

        let err = fixture
            .read(json!([{"if": [
                {"allOf": [{"then": []}]},
                {"then": []}
            ]}]))
            .unwrap_err();
        assert!(matches!(err, FlowError::UnexpectedStatement { ref name, ref parent, .. } if name == "then" && parent == "allOf"));

        // Branches nest only inside bodies
        for nested in ["if", "ifNot"] {
            let err = fixture
                .read(json!([{"ifNot": [
                    {"condition": {"type": "always"}},
                    {nested: [{"condition": {"type": "always"}}, {"then": []}]},
                    {"then": []}
                ]}]))
                .unwrap_err();
            assert!(matches!(err, FlowError::UnexpectedStatement { ref name, ref parent, .. } if name == nested && parent == "ifNot"));
        }
    }

    #[test]
    fn test_misplaced_statements_in_bodies() {
        let fixture = Fixture::new();
        for name in ["condition", "allOf", "anyOf", "then", "else"] {
            let err = fixture.read(json!([{name: {}}])).unwrap_err();
            match err {
                FlowError::MisplacedStatement { name: found, parent, path } => {
                    assert_eq!(found, name);
                    assert_eq!(parent, "root");
                    assert_eq!(path, format!("$[0].{}", name));
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        let err = fixture
            .read(json!([{"if": [
                {"condition": {"type": "always"}},
                {"then": [{"condition": {"type": "always"}}]}
            ]}]))
            .unwrap_err();
        assert!(matches!(err, FlowError::MisplacedStatement { ref parent, .. } if parent == "then"));
    }

    #[test]
    fn test_condition_discriminator() {
        let fixture = Fixture::new();
        let err = fixture
            .read(json!([{"if": [{"condition": {"value": true}}, {"then": []}]}]))
            .unwrap_err();
        assert!(matches!(err, FlowError::MissingDiscriminator { ref field, .. } if field == "type"));

        let err = fixture
            .read(json!([{"if": [{"condition": "always"}, {"then": []}]}]))
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidNode { .. }));

        let err = fixture
            .read(json!([{"if": [{"condition": {"type": "never"}}, {"then": []}]}]))
            .unwrap_err();
        assert!(matches!(err, FlowError::UnknownType { family: "condition", .. }));
    }

    #[test]
    fn test_custom_discriminator_field() {
        let mut fixture = Fixture::new();
        fixture.settings = FlowSettings::default().with_discriminator("kind");
        let log = fixture.run(json!([{"if": [
            {"condition": {"kind": "always", "value": true}},
            {"then": [{"log": {"tag": "kind"}}]}
        ]}]));
        assert_eq!(log, vec!["kind"]);
    }

    #[test]
    fn test_unknown_consumer_and_bad_node_shapes() {
        let fixture = Fixture::new();
        let err = fixture.read(json!([{"shout": {}}])).unwrap_err();
        assert!(matches!(err, FlowError::UnknownType { family: "consumer", ref kind, .. } if kind == "shout"));

        let err = fixture.read(json!([{"log": "tag"}])).unwrap_err();
        assert!(matches!(err, FlowError::InvalidNode { ref path, .. } if path == "$[0].log"));

        let err = fixture.read(json!(["log"])).unwrap_err();
        assert!(matches!(err, FlowError::InvalidNode { ref path, .. } if path == "$[0]"));

        let err = fixture.read(json!(42)).unwrap_err();
        assert!(matches!(err, FlowError::InvalidNode { ref path, .. } if path == "$"));
    }

    #[test]
    fn test_depth_limit() {
        let mut fixture = Fixture::new();
        fixture.settings = FlowSettings::default().with_max_depth(2);

        let nested = |levels: usize| {
            let mut body = json!([{"log": {"tag": "leaf"}}]);
            for _ in 0..levels {
                body = json!([{"if": [{"condition": {"type": "always"}}, {"then": body}]}]);
            }
            body
        };

        assert_eq!(fixture.run(nested(2)), vec!["leaf"]);
        let err = fixture.read(nested(3)).unwrap_err();
        assert!(matches!(err, FlowError::TooDeep { max_depth: 2, .. }));

        let groups = json!([{"if": [
            {"allOf": [{"anyOf": [{"condition": {"type": "always"}}]}]},
            {"then": []}
        ]}]);
        let err = fixture.read(groups).unwrap_err();
        assert!(matches!(err, FlowError::TooDeep { .. }));
    }
}
