// Flow - the composed, executable graph

//! # Flow
//!
//! A [`Flow`] is what parsing produces: the root body of a flow document,
//! composed per [`Step::compose`]. It is immutable once built and can be run
//! against any number of payloads.
//!
//! [`Flow::run_traced`] records every branch decision along the way, which is
//! useful to explain why a document took the route it did.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use super::condition::Condition;
use super::contract::Consumer;
use super::statement::Statement;
use super::step::Step;

/// The executable graph built from one flow document
pub struct Flow<T> {
    root: Option<Step<T>>,
}

impl<T> Flow<T> {
    pub fn new(root: Option<Step<T>>) -> Self {
        Self { root }
    }

    /// Compose a root body from a list of steps
    pub fn from_steps(steps: Vec<Step<T>>) -> Self {
        Self::new(Step::compose(steps))
    }

    /// A flow that does nothing
    pub fn empty() -> Self {
        Self::new(None)
    }

    pub fn root(&self) -> Option<&Step<T>> {
        self.root.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Run the flow against `input`
    ///
    /// Errors from conditions or consumers are returned as they were raised.
    pub fn run(&self, input: &mut T) -> anyhow::Result<()> {
        Step::execute_body(self.root.as_ref(), input, "$", None)
    }

    /// Run the flow and record every branch decision
    pub fn run_traced(&self, input: &mut T) -> anyhow::Result<ExecutionTrace> {
        let mut trace = ExecutionTrace::start();
        Step::execute_body(self.root.as_ref(), input, "$", Some(&mut trace))?;
        trace.finished_at = Some(Utc::now());
        Ok(trace)
    }

    /// Count the nodes of the graph
    pub fn statistics(&self) -> FlowStatistics {
        let mut stats = FlowStatistics::default();
        if let Some(root) = &self.root {
            stats.max_depth = root.depth();
            count_step(root, &mut stats);
        }
        stats
    }
}

fn count_step<T>(step: &Step<T>, stats: &mut FlowStatistics) {
    match step {
        Step::Consumer(_) => stats.consumers += 1,
        Step::Branch(branch) => {
            stats.branches += 1;
            count_condition(branch.condition(), stats);
            for body in [branch.then_step(), branch.else_step()].into_iter().flatten() {
                count_step(body, stats);
            }
        }
        Step::Sequence(steps) => steps.iter().for_each(|s| count_step(s, stats)),
    }
}

fn count_condition<T>(condition: &Condition<T>, stats: &mut FlowStatistics) {
    match condition {
        Condition::Predicate(_) => stats.predicates += 1,
        Condition::Group(group) => {
            stats.groups += 1;
            group.members().iter().for_each(|m| count_condition(m, stats));
        }
    }
}

impl<T> Clone for Flow<T> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
        }
    }
}

impl<T> fmt::Debug for Flow<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow").field("root", &self.root).finish()
    }
}

impl<T> Default for Flow<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Consumer<T> for Flow<T> {
    fn accept(&self, input: &mut T) -> anyhow::Result<()> {
        self.run(input)
    }
}

/// Which side of a branch ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Then,
    Else,
    /// The taken side has no body
    Skipped,
}

/// One branch evaluation recorded by [`Flow::run_traced`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchDecision {
    /// Locator in the canonical written form, e.g. `$[0].if[1].then[0].ifNot`
    pub path: String,
    pub statement: Statement,
    /// Raw condition result, before `ifNot` negation
    pub condition: bool,
    pub outcome: Outcome,
}

/// Detailed record of one run
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionTrace {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub decisions: Vec<BranchDecision>,
    pub consumers_invoked: usize,
}

impl ExecutionTrace {
    fn start() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            decisions: Vec::new(),
            consumers_invoked: 0,
        }
    }

    pub(crate) fn record(&mut self, decision: BranchDecision) {
        self.decisions.push(decision);
    }

    /// Decisions whose `then` side ran
    pub fn taken(&self) -> impl Iterator<Item = &BranchDecision> {
        self.decisions.iter().filter(|d| d.outcome == Outcome::Then)
    }
}

/// Node counts of a flow, as reported by `flow check`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlowStatistics {
    pub branches: usize,
    pub groups: usize,
    pub predicates: usize,
    pub consumers: usize,
    pub max_depth: usize,
}
