// Scenario tests for the flow engine: documents in, payloads through, documents out
use crate::{
    models::{Outcome, PredicateAdapter, Statement},
    builtins, FlowEngine, FlowError, FlowFormat, FlowSettings, Predicate,
};

use serde::Deserialize;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;

const CAR_FLOW: &str = r#"
- if:
    - condition:
        type: field_equals
        field: car
        value: volvo
    - then:
        - uppercase: { field: firstName }
    - else:
        - uppercase: { field: lastName }
"#;

fn engine() -> FlowEngine<Value> {
    FlowEngine::with_builtins().unwrap()
}

fn person(car: &str) -> Value {
    json!({"firstName": "John", "lastName": "Smith", "car": car})
}

fn nested_flow() -> Value {
    json!([
        {"if": [
            {"allOf": [
                {"condition": {"type": "size_equals", "size": 3}},
                {"condition": {"type": "field_equals", "field": "car", "value": "toyota"}}
            ]},
            {"then": [
                {"lowercase": {"field": "firstName"}},
                {"ifNot": [
                    {"condition": {"type": "field_equals", "field": "firstName", "value": "john"}},
                    {"then": [{"uppercase": {"field": "lastName"}}]},
                    {"else": [{"set": {"field": "status", "value": "matched"}}]}
                ]}
            ]}
        ]}
    ])
}

#[test]
fn test_car_flow_condition_true() {
    let flow = engine().parse_str(CAR_FLOW, FlowFormat::Yaml).unwrap();
    let mut payload = person("volvo");
    flow.run(&mut payload).unwrap();

    assert_eq!(payload["firstName"], "JOHN");
    assert_eq!(payload["lastName"], "Smith");
}

#[test]
fn test_car_flow_condition_false() {
    let flow = engine().parse_str(CAR_FLOW, FlowFormat::Yaml).unwrap();
    let mut payload = person("toyota");
    flow.run(&mut payload).unwrap();

    assert_eq!(payload["firstName"], "John");
    assert_eq!(payload["lastName"], "SMITH");
}

#[test]
fn test_nested_scenario() {
    let flow = engine().parse(&nested_flow()).unwrap();

    // lowercase runs before the nested ifNot, so its condition sees "john"
    let mut payload = person("toyota");
    let trace = flow.run_traced(&mut payload).unwrap();
    assert_eq!(
        payload,
        json!({"firstName": "john", "lastName": "Smith", "car": "toyota", "status": "matched"})
    );
    assert_eq!(trace.consumers_invoked, 2);

    let paths: Vec<_> = trace.decisions.iter().map(|d| d.path.as_str()).collect();
    assert_eq!(paths, vec!["$[0].if", "$[0].if[1].then[1].ifNot"]);
    assert_eq!(trace.decisions[0].outcome, Outcome::Then);
    assert!(trace.decisions[1].condition);
    assert_eq!(trace.decisions[1].outcome, Outcome::Else);

    // Outer allOf fails on the car; there is no else, so nothing changes
    let mut payload = person("volvo");
    flow.run(&mut payload).unwrap();
    assert_eq!(payload, person("volvo"));

    // Outer allOf fails on the size
    let mut payload = json!({"firstName": "John", "lastName": "Smith", "car": "toyota", "age": 42});
    let before = payload.clone();
    flow.run(&mut payload).unwrap();
    assert_eq!(payload, before);
}

#[test]
fn test_then_runs_in_declared_order() {
    let flow = engine()
        .parse(&json!([{"if": [
            {"condition": {"type": "always"}},
            {"then": [
                {"append": {"field": "lastName", "suffix": "-a"}},
                {"append": {"field": "lastName", "suffix": "-b"}}
            ]}
        ]}]))
        .unwrap();

    let mut payload = person("volvo");
    flow.run(&mut payload).unwrap();
    assert_eq!(payload["lastName"], "Smith-a-b");
}

#[test]
fn test_if_not_swaps_sides() {
    let engine = engine();
    let document = |statement: &str, then: &str, otherwise: &str| {
        json!([{statement: [
            {"condition": {"type": "field_equals", "field": "car", "value": "volvo"}},
            {"then": [{"set": {"field": "side", "value": then}}]},
            {"else": [{"set": {"field": "side", "value": otherwise}}]}
        ]}])
    };
    let negated = engine.parse(&document("ifNot", "a", "b")).unwrap();
    let swapped = engine.parse(&document("if", "b", "a")).unwrap();

    for car in ["volvo", "toyota"] {
        let mut left = person(car);
        let mut right = person(car);
        negated.run(&mut left).unwrap();
        swapped.run(&mut right).unwrap();
        assert_eq!(left, right);
    }
}

#[test]
fn test_if_not_true_without_else_is_no_op() {
    let flow = engine()
        .parse(&json!([{"ifNot": [
            {"condition": {"type": "field_equals", "field": "car", "value": "volvo"}},
            {"then": [{"uppercase": {"field": "firstName"}}]}
        ]}]))
        .unwrap();

    let mut payload = person("volvo");
    let trace = flow.run_traced(&mut payload).unwrap();
    assert_eq!(payload, person("volvo"));
    assert_eq!(trace.decisions[0].statement, Statement::IfNot);
    assert_eq!(trace.decisions[0].outcome, Outcome::Skipped);
}

#[test]
fn test_empty_groups_when_parsed() {
    let engine = engine();
    let document = |group: &str| {
        json!([{"if": [
            {group: []},
            {"then": [{"set": {"field": "side", "value": "then"}}]},
            {"else": [{"set": {"field": "side", "value": "else"}}]}
        ]}])
    };

    let mut payload = json!({});
    engine.parse(&document("allOf")).unwrap().run(&mut payload).unwrap();
    assert_eq!(payload["side"], "then");

    let mut payload = json!({});
    engine.parse(&document("anyOf")).unwrap().run(&mut payload).unwrap();
    assert_eq!(payload["side"], "else");
}

#[test]
fn test_round_trip_is_equivalent_and_stable() {
    let engine = engine();
    for document in [
        nested_flow(),
        FlowFormat::Yaml.parse(CAR_FLOW).unwrap(),
        json!([{"set": {"field": "a", "value": 1}}, {"remove": {"field": "b"}}]),
        json!([]),
    ] {
        let original = engine.parse(&document).unwrap();
        let written = engine.to_value(&original);
        let reread = engine.parse(&written).unwrap();

        assert_eq!(engine.to_value(&reread), written);
        assert_eq!(reread.statistics(), original.statistics());

        for payload in [person("volvo"), person("toyota"), json!({"b": 2})] {
            let mut left = payload.clone();
            let mut right = payload;
            original.run(&mut left).unwrap();
            reread.run(&mut right).unwrap();
            assert_eq!(left, right);
        }
    }
}

#[test]
fn test_object_shape_is_written_canonically() {
    let engine = engine();
    let flow = engine
        .parse(&json!({
            "if": {
                "anyOf": {
                    "condition": {"type": "field_exists", "field": "car"}
                },
                "then": {"trim": {"field": "car"}}
            }
        }))
        .unwrap();

    assert_eq!(
        engine.to_value(&flow),
        json!([{"if": [
            {"anyOf": [{"condition": {"type": "field_exists", "field": "car"}}]},
            {"then": [{"trim": {"field": "car"}}]}
        ]}])
    );
}

#[test]
fn test_strict_mode_rejects_object_shape() {
    let engine = FlowEngine::builder()
        .with_conditions(builtins::condition_registry().unwrap())
        .with_consumers(builtins::consumer_registry().unwrap())
        .with_settings(FlowSettings::default().with_object_shape(false))
        .build()
        .unwrap();

    assert!(engine.parse_str(CAR_FLOW, FlowFormat::Yaml).is_ok());
    let err = engine
        .parse(&json!([{"if": {"condition": {"type": "always"}, "then": []}}]))
        .unwrap_err();
    assert!(matches!(err, FlowError::InvalidNode { ref path, .. } if path == "$[0].if"));
}

#[test]
fn test_two_conditions_in_a_branch() {
    let err = engine()
        .parse_str(
            r#"
- if:
    - condition: { type: always }
    - condition: { type: always }
    - then: []
"#,
            FlowFormat::Yaml,
        )
        .unwrap_err();
    assert!(matches!(err, FlowError::DuplicateCondition { ref name, .. } if name == "condition"));
    assert!(err.to_string().contains("$[0].if[1].condition"));
}

#[test]
fn test_repeated_fields_in_object_shape() {
    let engine = engine();
    let documents = [
        (
            FlowFormat::Json,
            r#"{"if": {"condition": {"type": "always", "value": false}, "condition": {"type": "always"}, "then": {}}}"#,
            r#"{"if": {"condition": {"type": "always"}, "then": {}, "then": {}}}"#,
            r#"{"if": {"condition": {"type": "always"}, "then": {
                "append": {"field": "lastName", "suffix": "-a"},
                "append": {"field": "lastName", "suffix": "-b"}
            }}}"#,
        ),
        (
            FlowFormat::Yaml,
            "if:\n  condition: { type: always, value: false }\n  condition: { type: always }\n  then: {}\n",
            "if:\n  condition: { type: always }\n  then: {}\n  then: {}\n",
            "if:\n  condition: { type: always }\n  then:\n    append: { field: lastName, suffix: -a }\n    append: { field: lastName, suffix: -b }\n",
        ),
    ];

    for (format, conditions, bodies, consumers) in documents {
        let err = engine.parse_str(conditions, format).unwrap_err();
        assert!(matches!(err, FlowError::DuplicateCondition { ref path, .. } if path == "$.if[1].condition"));

        let err = engine.parse_str(bodies, format).unwrap_err();
        assert!(matches!(err, FlowError::DuplicateStatement { ref name, .. } if name == "then"));

        let flow = engine.parse_str(consumers, format).unwrap();
        let mut payload = person("volvo");
        flow.run(&mut payload).unwrap();
        assert_eq!(payload["lastName"], "Smith-a-b");
        assert_eq!(flow.statistics().consumers, 2);
    }
}

#[test]
fn test_branch_without_then() {
    let err = engine()
        .parse(&json!([{"if": [{"condition": {"type": "always"}}]}]))
        .unwrap_err();
    assert!(matches!(err, FlowError::MissingThen { .. }));
}

#[test]
fn test_group_with_foo_child_names_it() {
    let err = engine()
        .parse(&json!([{"if": [
            {"allOf": [{"foo": {"type": "always"}}]},
            {"then": []}
        ]}]))
        .unwrap_err();
    assert!(matches!(err, FlowError::UnexpectedStatement { ref name, .. } if name == "foo"));
    assert!(err.to_string().contains("'foo'"));
}

#[test]
fn test_invalid_builtin_configuration() {
    let err = engine()
        .parse(&json!([{"if": [
            {"condition": {"type": "field_matches", "field": "car", "pattern": "(unclosed"}},
            {"then": []}
        ]}]))
        .unwrap_err();
    assert!(matches!(err, FlowError::InvalidConfig { ref kind, .. } if kind == "field_matches"));
}

#[test]
fn test_evaluation_errors_reach_the_caller() {
    let flow = engine().parse(&json!([{"uppercase": {"field": "a"}}])).unwrap();
    let mut payload = json!(["not", "an", "object"]);
    let err = flow.run(&mut payload).unwrap_err();
    assert!(err.to_string().contains("expected an object payload"));
}

/// Raw rule with no Predicate impl of its own
#[derive(Deserialize)]
struct MinimumAge {
    field: String,
    min: u64,
}

#[derive(Default)]
struct MinimumAgeAdapter {
    rule: Option<MinimumAge>,
}

impl Predicate<Value> for MinimumAgeAdapter {
    fn test(&self, input: &Value) -> anyhow::Result<bool> {
        let rule = self
            .rule
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("adaptee not set"))?;
        let age = builtins::lookup(input, &rule.field).and_then(Value::as_u64);
        Ok(age.map_or(false, |age| age >= rule.min))
    }
}

impl PredicateAdapter<Value> for MinimumAgeAdapter {
    type Adaptee = MinimumAge;

    fn set_adaptee(&mut self, adaptee: MinimumAge) -> anyhow::Result<()> {
        self.rule = Some(adaptee);
        Ok(())
    }
}

#[derive(Deserialize)]
struct Counter {
    field: String,
}

#[test]
fn test_adapted_types_resolve_like_native_ones() {
    let mut conditions = builtins::condition_registry().unwrap();
    conditions
        .register_adapted::<MinimumAgeAdapter>("minimum_age")
        .unwrap();

    let mut consumers = builtins::consumer_registry().unwrap();
    consumers
        .register_with("increment", |counter: &Counter, payload: &mut Value| {
            let current = builtins::lookup(payload, &counter.field)
                .and_then(Value::as_i64)
                .unwrap_or(0);
            builtins::assign(payload, &counter.field, json!(current + 1))
        })
        .unwrap();

    let engine = FlowEngine::builder()
        .with_conditions(conditions)
        .with_consumers(consumers)
        .build()
        .unwrap();

    let flow = engine
        .parse_str(
            r#"
- if:
    - condition: { type: minimum_age, field: age, min: 18 }
    - then:
        - increment: { field: adults }
        - increment: { field: adults }
    - else:
        - increment: { field: minors }
"#,
            FlowFormat::Yaml,
        )
        .unwrap();

    let mut adult = json!({"age": 30});
    flow.run(&mut adult).unwrap();
    assert_eq!(adult["adults"], 2);

    let mut minor = json!({"age": 12});
    flow.run(&mut minor).unwrap();
    assert_eq!(minor["minors"], 1);

    // The adapted node writes back exactly as configured
    let written = engine.to_value(&flow);
    assert_eq!(
        written[0]["if"][0],
        json!({"condition": {"type": "minimum_age", "field": "age", "min": 18}})
    );
}

#[test]
fn test_load_and_save_files() {
    let engine = engine();

    let mut source = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    source.write_all(CAR_FLOW.as_bytes()).unwrap();
    let flow = engine.load(source.path()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("car.json");
    engine.save(&flow, &target).unwrap();

    let saved: Value = serde_json::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(saved, engine.to_value(&flow));

    let reloaded = engine.load(&target).unwrap();
    let mut payload = person("volvo");
    reloaded.run(&mut payload).unwrap();
    assert_eq!(payload["firstName"], "JOHN");

    let err = engine.load(&dir.path().join("car.xml")).unwrap_err();
    assert!(matches!(err, FlowError::UnsupportedFormat(_)));
}

#[test]
fn test_flows_are_shared_between_threads() {
    let flow = Arc::new(engine().parse_str(CAR_FLOW, FlowFormat::Yaml).unwrap());

    let results: Vec<Value> = std::thread::scope(|scope| {
        let handles: Vec<_> = ["volvo", "toyota", "volvo", "saab"]
            .into_iter()
            .map(|car| {
                let flow = Arc::clone(&flow);
                scope.spawn(move || {
                    let mut payload = person(car);
                    flow.run(&mut payload).unwrap();
                    payload
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results[0]["firstName"], "JOHN");
    assert_eq!(results[1]["lastName"], "SMITH");
    assert_eq!(results[2]["firstName"], "JOHN");
    assert_eq!(results[3]["lastName"], "SMITH");
}

#[test]
fn test_statistics_of_parsed_flow() {
    let stats = engine().parse(&nested_flow()).unwrap().statistics();
    assert_eq!(stats.branches, 2);
    assert_eq!(stats.groups, 1);
    assert_eq!(stats.predicates, 3);
    assert_eq!(stats.consumers, 3);
    assert_eq!(stats.max_depth, 2);
}
