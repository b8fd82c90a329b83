// Core domain models for the flow engine
// The grammar, the node contracts and the composed graph

//! # Domain Models Module
//!
//! This module contains everything a parsed flow is made of. Nothing here knows
//! about configuration formats or registries; those live in `engine`.
//!
//! Built bottom-up:
//! - `statement`: the seven grammar symbols
//! - `contract`: `Predicate<T>` / `Consumer<T>` and externally-typed nodes
//! - `adapter`: wrapping foreign types so they satisfy the contracts
//! - `condition`: predicates and `allOf`/`anyOf` groups
//! - `step`: consumers, `if`/`ifNot` branches and sequences
//! - `flow`: the root graph, execution traces and statistics

// Contains Statement - the grammar symbols and their lookup
pub mod statement;

// Contains Predicate, Consumer and Configured
pub mod contract;

// Contains PredicateAdapter, ConsumerAdapter and Adapted
pub mod adapter;

// Contains Condition and ConditionGroup
pub mod condition;

// Contains Step and Branch
pub mod step;

// Contains Flow, ExecutionTrace and FlowStatistics
pub mod flow;

pub use adapter::{Adapted, ConsumerAdapter, PredicateAdapter};
pub use condition::{Condition, ConditionGroup};
pub use contract::{consumer_fn, predicate_fn, Configured, Consumer, FnConsumer, FnPredicate, Predicate};
pub use flow::{BranchDecision, ExecutionTrace, Flow, FlowStatistics, Outcome};
pub use statement::Statement;
pub use step::{Branch, Step};
