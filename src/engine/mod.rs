// Flow Engine
// Type registries, reading and writing configuration trees, settings

//! # Flow Engine Module
//!
//! This module turns configuration trees into [`crate::models::Flow`]s and
//! back. It is the layer between the domain models and the documents users
//! write.
//!
//! ## Architecture Overview
//!
//! - **Domain Models**: the executable graph (in `models/`)
//! - **Engine Layer**: parsing, type resolution, writing (this module)
//! - **Built-ins**: default node types over JSON payloads (in `builtins/`)
//!
//! ## Engine Components
//!
//! ### Registries (`registry` module)
//! - Map type discriminators to factories for conditions and consumers
//! - Accept contract implementations, adapters and forwarding closures
//!
//! ### Reader (`reader` module)
//! - Validates the grammar while building the graph
//! - Reports the first error with the path of the offending node
//!
//! ### Writer (`writer` module)
//! - Produces the canonical shape of a flow
//!
//! ### Formats and Settings (`format`, `settings` modules)
//! - JSON and YAML documents
//! - Layered engine settings through the `config` crate
//!
//! ### Flow Engine (`flows` module)
//! - `FlowEngine`: one facade over all of the above
//!
//! ## Rust Learning Notes:
//!
//! ### Re-exports for API Design
//! The `pub use` statements flatten the module hierarchy so callers can write
//! `engine::FlowEngine` instead of `engine::flows::FlowEngine`.

/// Type registries for externally-typed nodes
///
/// Contains:
/// - TypeRegistry and its ConditionRegistry / ConsumerRegistry aliases
/// - Registration of contract types, adapters and closures
pub mod registry;

/// Document formats
pub mod format;

/// Engine settings loaded through the config crate
pub mod settings;

/// Configuration tree → Flow
///
/// Contains:
/// - FlowReader with one function per grammar position
/// - Node shape normalisation and depth limiting
pub mod reader;

/// Flow → canonical configuration tree
pub mod writer;

/// FlowEngine facade and its builder
pub mod flows;

pub use flows::{FlowEngine, FlowEngineBuilder};
pub use format::FlowFormat;
pub use reader::FlowReader;
pub use registry::{ConditionRegistry, ConsumerRegistry, TypeRegistry};
pub use settings::FlowSettings;
pub use writer::FlowWriter;

#[cfg(test)]
mod tests;
