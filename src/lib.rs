// Flow Engine - Rust Edition
// Declarative if/then/else flows over predicates and consumers, driven by configuration

//! # Flow Engine Library
//!
//! This is the library root for the flow engine: a small interpreter that turns a
//! configuration tree (JSON or YAML) into an executable chain of conditions and
//! consumers, runs it against payloads, and writes it back out again.
//!
//! ## Core Components
//!
//! ### Domain Models
//! - [`Statement`]: The seven grammar symbols (`if`, `ifNot`, `allOf`, `anyOf`,
//!   `condition`, `then`, `else`)
//! - [`Predicate`] / [`Consumer`]: The two contracts every node satisfies
//! - [`Condition`] / [`ConditionGroup`]: Single predicates and `allOf`/`anyOf` groups
//! - [`Branch`] / [`Step`]: `if`/`ifNot` branches and consumer sequences
//! - [`Flow`]: The composed, immutable, executable graph
//!
//! ### Engine
//!
//! #### [`FlowEngine`] - Parse, Run, Write
//!
//! One engine instance is parameterised by a condition registry, a consumer
//! registry and [`FlowSettings`]. It parses configuration trees into [`Flow`]s
//! and renders flows back into the canonical configuration shape.
//!
//! **Usage Example:**
//! ```rust
//! use flow_engine::{FlowEngine, FlowFormat};
//! use serde_json::json;
//!
//! let engine = FlowEngine::with_builtins().unwrap();
//! let flow = engine.parse_str(r#"
//! - if:
//!     - condition: { type: field_equals, field: car, value: volvo }
//!     - then:
//!         - uppercase: { field: firstName }
//!     - else:
//!         - uppercase: { field: lastName }
//! "#, FlowFormat::Yaml).unwrap();
//!
//! let mut person = json!({"firstName": "John", "lastName": "Smith", "car": "volvo"});
//! flow.run(&mut person).unwrap();
//! assert_eq!(person["firstName"], "JOHN");
//! assert_eq!(person["lastName"], "Smith");
//! ```
//!
//! ### Built-in Library
//! [`builtins`] ships conditions (`field_equals`, `field_matches`, `size_equals`, ...)
//! and consumers (`uppercase`, `set`, `rename`, ...) over `serde_json::Value` payloads.
//!
//! ## Rust Learning Notes:
//!
//! ### Trait Objects at the Seams
//! Conditions and consumers supplied by the embedding application are stored as
//! `Arc<dyn Predicate<T>>` / `Arc<dyn Consumer<T>>`. The flow-native nodes
//! (groups, branches, sequences) are plain enums, so the reader and writer can
//! `match` on them exhaustively.

// Core domain models: grammar, contracts, composed graph
pub mod models;

// Registries, reader, writer, settings and the engine facade
pub mod engine;

// Default conditions and consumers over JSON payloads
pub mod builtins;

// Re-export core domain types for easy access
pub use models::{
    Adapted,          // Closure-based adapter around a raw adaptee
    Branch,           // if / ifNot
    BranchDecision,   // One recorded branch evaluation
    Condition,        // A predicate or a group
    ConditionGroup,   // allOf / anyOf
    Configured,       // Externally-typed node with its configuration
    Consumer,         // accept(&mut T)
    ConsumerAdapter,  // Adapter contract for consumers
    ExecutionTrace,   // Detailed record of one run
    Flow,             // The executable graph
    FlowStatistics,   // Node counts and depth
    Outcome,          // Which side of a branch ran
    Predicate,        // test(&T)
    PredicateAdapter, // Adapter contract for predicates
    Statement,        // Grammar symbols
    Step,             // Consumer, branch or sequence
};

// Re-export engine types for convenience
pub use engine::{
    flows::{FlowEngine, FlowEngineBuilder},
    format::FlowFormat,
    reader::FlowReader,
    registry::{ConditionRegistry, ConsumerRegistry, TypeRegistry},
    settings::FlowSettings,
    writer::FlowWriter,
};

use thiserror::Error;

/// Errors raised while building, loading or writing flows
///
/// Evaluation never produces a `FlowError`: whatever a condition or consumer
/// returns from `test`/`accept` reaches the caller of [`Flow::run`] untouched.
///
/// Every structural variant carries `path`, a locator such as
/// `$[0].if[2].then[1]` pointing at the offending node.
#[derive(Error, Debug)]
pub enum FlowError {
    /// A child that the enclosing statement does not permit
    #[error("Unexpected '{name}' inside '{parent}' at {path}")]
    UnexpectedStatement {
        name: String,
        parent: String,
        path: String,
    },

    /// A known statement used where only consumers and branches may appear
    #[error("Statement '{name}' cannot be placed inside '{parent}' at {path}")]
    MisplacedStatement {
        name: String,
        parent: String,
        path: String,
    },

    /// A second condition (`condition`, `allOf` or `anyOf`) on one branch
    #[error("Duplicate condition '{name}' in '{parent}' at {path}: a branch takes exactly one condition")]
    DuplicateCondition {
        name: String,
        parent: String,
        path: String,
    },

    /// A second `then` or `else` on one branch
    #[error("Duplicate '{name}' in '{parent}' at {path}")]
    DuplicateStatement {
        name: String,
        parent: String,
        path: String,
    },

    /// A branch without any condition
    #[error("Missing condition in '{parent}' at {path}")]
    MissingCondition { parent: String, path: String },

    /// A branch without `then`
    #[error("Missing 'then' in '{parent}' at {path}")]
    MissingThen { parent: String, path: String },

    /// A node of the wrong JSON shape
    #[error("Invalid node at {path}: expected {expected}, found {found}")]
    InvalidNode {
        path: String,
        expected: String,
        found: String,
    },

    /// Nesting beyond `FlowSettings::max_depth`
    #[error("Flow too deeply nested at {path}: maximum depth is {max_depth}")]
    TooDeep { path: String, max_depth: usize },

    /// A `condition` without its type discriminator field
    #[error("Missing '{field}' type discriminator at {path}")]
    MissingDiscriminator { field: String, path: String },

    /// A discriminator nobody registered
    #[error("Unknown {family} type '{kind}' at {path}")]
    UnknownType {
        family: &'static str,
        kind: String,
        path: String,
    },

    /// The registered factory rejected the node's configuration
    #[error("Invalid configuration for {family} type '{kind}' at {path}: {source}")]
    InvalidConfig {
        family: &'static str,
        kind: String,
        path: String,
        source: anyhow::Error,
    },

    /// The same discriminator registered twice in one registry
    #[error("{family} type '{kind}' is already registered")]
    DuplicateType { family: &'static str, kind: String },

    /// File extension or format name we cannot read or write
    #[error("Unsupported flow format: {0}")]
    UnsupportedFormat(String),

    /// File system errors while loading or saving flows
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML serialization/deserialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Settings could not be loaded or failed validation
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),
}

/// Type alias for Results that use our custom error type
pub type Result<T> = std::result::Result<T, FlowError>;
