// Flow engine - parse, load, render and save flows

//! # Flow Engine Module
//!
//! [`FlowEngine`] ties the pieces of the engine together: the two type
//! registries, the [`FlowSettings`], the [`FlowReader`] and the [`FlowWriter`].
//! It is the entry point for embedding applications and for the `flow` CLI.
//!
//! ## Lifecycle
//!
//! 1. Build the engine once, registering condition and consumer types
//! 2. Parse any number of flow documents into [`Flow`]s
//! 3. Run flows against payloads, from as many threads as needed
//!
//! ## Rust Learning Notes:
//!
//! ### Immutable After Build
//! Registries are filled while the engine is built and only read afterwards,
//! so `&FlowEngine` can be shared between threads without locks. Parsed flows
//! own everything they need and do not borrow from the engine.

use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::format::FlowFormat;
use super::reader::FlowReader;
use super::registry::{ConditionRegistry, ConsumerRegistry};
use super::settings::FlowSettings;
use super::writer::FlowWriter;
use crate::builtins;
use crate::models::Flow;
use crate::Result;

/// Parses, loads and writes flows over payloads of type `T`
///
/// ## Usage Example:
///
/// ```rust
/// use flow_engine::{FlowEngine, FlowFormat};
/// use serde_json::json;
///
/// let engine = FlowEngine::with_builtins().unwrap();
/// let flow = engine.parse(&json!([
///     {"ifNot": [
///         {"condition": {"type": "field_exists", "field": "id"}},
///         {"then": [{"set": {"field": "id", "value": 0}}]}
///     ]}
/// ])).unwrap();
///
/// let mut payload = json!({});
/// flow.run(&mut payload).unwrap();
/// assert_eq!(payload["id"], 0);
///
/// // Written back in the canonical shape
/// let yaml = engine.render(&flow, FlowFormat::Yaml).unwrap();
/// assert!(yaml.contains("ifNot"));
/// ```
pub struct FlowEngine<T> {
    conditions: ConditionRegistry<T>,
    consumers: ConsumerRegistry<T>,
    settings: FlowSettings,
}

impl<T: 'static> FlowEngine<T> {
    /// Create an engine over the given registries with default settings
    pub fn new(conditions: ConditionRegistry<T>, consumers: ConsumerRegistry<T>) -> Self {
        Self {
            conditions,
            consumers,
            settings: FlowSettings::default(),
        }
    }

    pub fn builder() -> FlowEngineBuilder<T> {
        FlowEngineBuilder::new()
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    pub fn conditions(&self) -> &ConditionRegistry<T> {
        &self.conditions
    }

    pub fn consumers(&self) -> &ConsumerRegistry<T> {
        &self.consumers
    }

    /// A reader bound to this engine's registries and settings
    pub fn reader(&self) -> FlowReader<'_, T> {
        FlowReader::new(&self.conditions, &self.consumers, &self.settings)
    }

    /// A writer using this engine's discriminator field
    pub fn writer(&self) -> FlowWriter {
        FlowWriter::new(self.settings.discriminator.clone())
    }

    /// Build a flow from a configuration tree
    pub fn parse(&self, document: &Value) -> Result<Flow<T>> {
        let flow = self.reader().read(document)?;
        let stats = flow.statistics();
        debug!(
            branches = stats.branches,
            groups = stats.groups,
            predicates = stats.predicates,
            consumers = stats.consumers,
            max_depth = stats.max_depth,
            "parsed flow"
        );
        Ok(flow)
    }

    /// Build a flow from document text
    pub fn parse_str(&self, text: &str, format: FlowFormat) -> Result<Flow<T>> {
        self.parse(&format.parse(text)?)
    }

    /// Build a flow from a file; the format follows the file extension
    pub fn load(&self, path: &Path) -> Result<Flow<T>> {
        let format = FlowFormat::from_path(path)?;
        let text = fs::read_to_string(path)?;
        let flow = self.parse_str(&text, format)?;
        info!(path = %path.display(), %format, "loaded flow");
        Ok(flow)
    }

    /// The canonical configuration tree of a flow
    pub fn to_value(&self, flow: &Flow<T>) -> Value {
        self.writer().write(flow)
    }

    /// The canonical document text of a flow
    pub fn render(&self, flow: &Flow<T>, format: FlowFormat) -> Result<String> {
        format.render(&self.to_value(flow))
    }

    /// Write a flow to a file; the format follows the file extension
    pub fn save(&self, flow: &Flow<T>, path: &Path) -> Result<()> {
        let format = FlowFormat::from_path(path)?;
        fs::write(path, self.render(flow, format)?)?;
        info!(path = %path.display(), %format, "saved flow");
        Ok(())
    }
}

impl FlowEngine<Value> {
    /// Engine over JSON payloads with the built-in conditions and consumers
    pub fn with_builtins() -> Result<Self> {
        let engine = Self::new(builtins::condition_registry()?, builtins::consumer_registry()?);
        info!(
            conditions = engine.conditions.len(),
            consumers = engine.consumers.len(),
            "flow engine ready with built-in types"
        );
        Ok(engine)
    }
}

impl<T> Clone for FlowEngine<T> {
    fn clone(&self) -> Self {
        Self {
            conditions: self.conditions.clone(),
            consumers: self.consumers.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<T> std::fmt::Debug for FlowEngine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowEngine")
            .field("conditions", &self.conditions)
            .field("consumers", &self.consumers)
            .field("settings", &self.settings)
            .finish()
    }
}

/// Assembles a [`FlowEngine`] from parts
pub struct FlowEngineBuilder<T> {
    conditions: Option<ConditionRegistry<T>>,
    consumers: Option<ConsumerRegistry<T>>,
    settings: FlowSettings,
}

impl<T: 'static> FlowEngineBuilder<T> {
    pub fn new() -> Self {
        Self {
            conditions: None,
            consumers: None,
            settings: FlowSettings::default(),
        }
    }

    pub fn with_conditions(mut self, conditions: ConditionRegistry<T>) -> Self {
        self.conditions = Some(conditions);
        self
    }

    pub fn with_consumers(mut self, consumers: ConsumerRegistry<T>) -> Self {
        self.consumers = Some(consumers);
        self
    }

    pub fn with_settings(mut self, settings: FlowSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Finish the engine; missing registries are empty
    ///
    /// ## Errors
    /// The settings are validated first.
    pub fn build(self) -> Result<FlowEngine<T>> {
        self.settings.validate()?;
        let engine = FlowEngine {
            conditions: self.conditions.unwrap_or_else(ConditionRegistry::conditions),
            consumers: self.consumers.unwrap_or_else(ConsumerRegistry::consumers),
            settings: self.settings,
        };
        info!(
            conditions = engine.conditions.len(),
            consumers = engine.consumers.len(),
            max_depth = engine.settings.max_depth,
            "flow engine built"
        );
        Ok(engine)
    }
}

impl<T: 'static> Default for FlowEngineBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
