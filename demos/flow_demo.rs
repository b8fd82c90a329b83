// Flow Engine Demo - one document, several payloads, traced decisions

use flow_engine::{builtins, FlowEngine, FlowFormat, Outcome};
use serde_json::{json, Value};

const PUBLISHING_FLOW: &str = include_str!("publishing.yaml");

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔀 Flow Engine Demo");
    println!("===================\n");

    // An engine over JSON payloads with the built-in types, plus one of our own
    let mut conditions = builtins::condition_registry()?;
    conditions.register_with("has_tag", |tag: &Tag, article: &Value| {
        let tags = builtins::lookup(article, "tags").and_then(Value::as_array);
        Ok(tags.map_or(false, |tags| tags.iter().any(|t| t == &tag.tag)))
    })?;
    let engine = FlowEngine::builder()
        .with_conditions(conditions)
        .with_consumers(builtins::consumer_registry()?)
        .build()?;

    println!("📋 Conditions: {:?}", engine.conditions().kinds().collect::<Vec<_>>());
    println!("📋 Consumers:  {:?}\n", engine.consumers().kinds().collect::<Vec<_>>());

    let flow = engine.parse_str(PUBLISHING_FLOW, FlowFormat::Yaml)?;
    let stats = flow.statistics();
    println!(
        "📄 Parsed flow: {} branches, {} groups, {} predicates, {} consumers, depth {}\n",
        stats.branches, stats.groups, stats.predicates, stats.consumers, stats.max_depth
    );

    // Scenario 1: ready to publish
    demo_run(
        &flow,
        "Ready Article",
        json!({
            "title": "  Flows in practice ",
            "content": "...",
            "status": "approved",
            "word_count": 1200
        }),
    )?;

    // Scenario 2: too short, stays a draft
    demo_run(
        &flow,
        "Short Article",
        json!({"title": "Short", "content": "...", "status": "approved", "word_count": 90}),
    )?;

    // Scenario 3: emergency override with a lowercase title
    demo_run(
        &flow,
        "Emergency Override",
        json!({"title": "breaking news", "emergency": true}),
    )?;

    // Custom condition registered through a forwarding closure
    let tagged = engine.parse(&json!([
        {"if": [
            {"condition": {"type": "has_tag", "tag": "rust"}},
            {"then": [{"set": {"field": "featured", "value": true}}]}
        ]}
    ]))?;
    let mut article = json!({"tags": ["rust", "flows"]});
    tagged.run(&mut article)?;
    println!("🏷️  Tagged article: {}\n", article);

    println!("📝 Canonical JSON form of the publishing flow:");
    println!("{}\n", engine.render(&flow, FlowFormat::Json)?);

    println!("✅ Flow engine demo completed successfully!");
    Ok(())
}

#[derive(serde::Deserialize)]
struct Tag {
    tag: String,
}

fn demo_run(
    flow: &flow_engine::Flow<Value>,
    name: &str,
    mut article: Value,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("🎯 Scenario: {}", name);
    let trace = flow.run_traced(&mut article)?;
    for decision in &trace.decisions {
        let marker = match decision.outcome {
            Outcome::Then => "✅",
            Outcome::Else => "↪️ ",
            Outcome::Skipped => "⏭️ ",
        };
        println!("  {} {} (condition: {})", marker, decision.path, decision.condition);
    }
    println!("  Result: {}\n", article);
    Ok(())
}
