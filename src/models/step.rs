// Steps - consumers, if/ifNot branches and ordered sequences

//! # Steps
//!
//! Bodies (`then`, `else` and the document root) are ordered lists of steps.
//! A [`Step`] is one of:
//!
//! - an externally-typed consumer
//! - a [`Branch`] (`if` / `ifNot`)
//! - a sequence of steps run in declared order against the same payload
//!
//! [`Step::compose`] turns a parsed list into the smallest equivalent shape:
//! nothing for an empty list, the step itself for a single entry, and a
//! sequence otherwise.
//!
//! ## Rust Learning Notes:
//!
//! ### Box for Recursion
//! `Branch` contains `Step`s and `Step` contains a `Branch`, so the branch is
//! boxed to give the enum a known size.

use std::fmt;

use super::condition::Condition;
use super::contract::{Configured, Consumer};
use super::flow::{BranchDecision, ExecutionTrace, Outcome};
use super::statement::Statement;

/// `if` / `ifNot`: one condition, a `then` body and an optional `else` body
pub struct Branch<T> {
    condition: Condition<T>,
    then: Option<Step<T>>,
    otherwise: Option<Step<T>>,
    negate: bool,
}

impl<T> Branch<T> {
    /// `if`
    pub fn new(condition: Condition<T>, then: Option<Step<T>>, otherwise: Option<Step<T>>) -> Self {
        Self {
            condition,
            then,
            otherwise,
            negate: false,
        }
    }

    /// `ifNot`: the condition is inverted before branching
    pub fn negated(
        condition: Condition<T>,
        then: Option<Step<T>>,
        otherwise: Option<Step<T>>,
    ) -> Self {
        Self {
            negate: true,
            ..Self::new(condition, then, otherwise)
        }
    }

    /// Branch for `if` or `ifNot`; `None` for any other statement
    pub fn for_statement(
        statement: Statement,
        condition: Condition<T>,
        then: Option<Step<T>>,
        otherwise: Option<Step<T>>,
    ) -> Option<Self> {
        match statement {
            Statement::If => Some(Self::new(condition, then, otherwise)),
            Statement::IfNot => Some(Self::negated(condition, then, otherwise)),
            _ => None,
        }
    }

    pub fn statement(&self) -> Statement {
        if self.negate {
            Statement::IfNot
        } else {
            Statement::If
        }
    }

    pub fn is_negated(&self) -> bool {
        self.negate
    }

    pub fn condition(&self) -> &Condition<T> {
        &self.condition
    }

    pub fn then_step(&self) -> Option<&Step<T>> {
        self.then.as_ref()
    }

    pub fn else_step(&self) -> Option<&Step<T>> {
        self.otherwise.as_ref()
    }

    /// Whether `then` is the side to take: condition XOR negation
    pub fn decide(&self, input: &T) -> anyhow::Result<bool> {
        Ok(self.condition.test(input)? != self.negate)
    }

    /// Run the taken side; an absent side does nothing
    pub fn accept(&self, input: &mut T) -> anyhow::Result<()> {
        self.execute(input, "", 0, None)
    }

    pub fn depth(&self) -> usize {
        let bodies = [self.then.as_ref(), self.otherwise.as_ref()]
            .into_iter()
            .flatten()
            .map(Step::depth)
            .max()
            .unwrap_or(0);
        1 + self.condition.depth().max(bodies)
    }

    pub(crate) fn execute(
        &self,
        input: &mut T,
        prefix: &str,
        index: usize,
        mut trace: Option<&mut ExecutionTrace>,
    ) -> anyhow::Result<()> {
        let passed = self.condition.test(input)?;
        let take_then = passed != self.negate;
        let side = if take_then { &self.then } else { &self.otherwise };

        let path = match trace.as_deref_mut() {
            Some(trace) => {
                let path = format!("{}[{}].{}", prefix, index, self.statement());
                let outcome = match (take_then, side.is_some()) {
                    (_, false) => Outcome::Skipped,
                    (true, true) => Outcome::Then,
                    (false, true) => Outcome::Else,
                };
                tracing::trace!(path = %path, passed, ?outcome, "branch evaluated");
                trace.record(BranchDecision {
                    path: path.clone(),
                    statement: self.statement(),
                    condition: passed,
                    outcome,
                });
                path
            }
            None => String::new(),
        };

        let body_prefix = if trace.is_some() {
            if take_then {
                format!("{}[1].then", path)
            } else {
                format!("{}[2].else", path)
            }
        } else {
            String::new()
        };
        Step::execute_body(side.as_ref(), input, &body_prefix, trace)
    }
}

impl<T> Clone for Branch<T> {
    fn clone(&self) -> Self {
        Self {
            condition: self.condition.clone(),
            then: self.then.clone(),
            otherwise: self.otherwise.clone(),
            negate: self.negate,
        }
    }
}

impl<T> fmt::Debug for Branch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(self.statement().name())
            .field("condition", &self.condition)
            .field("then", &self.then)
            .field("else", &self.otherwise)
            .finish()
    }
}

impl<T> Consumer<T> for Branch<T> {
    fn accept(&self, input: &mut T) -> anyhow::Result<()> {
        Branch::accept(self, input)
    }
}

/// One entry of a body
pub enum Step<T> {
    /// Externally-typed consumer
    Consumer(Configured<dyn Consumer<T>>),
    /// `if` / `ifNot`
    Branch(Box<Branch<T>>),
    /// Steps run in order against the same payload
    Sequence(Vec<Step<T>>),
}

impl<T> Step<T> {
    /// Compose a parsed body
    ///
    /// Zero steps compose to `None`, one step is returned unwrapped and more
    /// become a [`Step::Sequence`]. Nested sequences are flattened so that
    /// sequence members are always consumers or branches.
    pub fn compose(steps: Vec<Step<T>>) -> Option<Step<T>> {
        let mut flat = Vec::with_capacity(steps.len());
        flatten_into(steps, &mut flat);
        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(Step::Sequence(flat)),
        }
    }

    /// The entries this step stands for: a sequence's members, or itself
    pub fn members(&self) -> &[Step<T>] {
        match self {
            Step::Sequence(steps) => steps,
            _ => std::slice::from_ref(self),
        }
    }

    /// Nesting depth, counting each branch and group as one level
    pub fn depth(&self) -> usize {
        match self {
            Step::Consumer(_) => 0,
            Step::Branch(branch) => branch.depth(),
            Step::Sequence(steps) => steps.iter().map(Step::depth).max().unwrap_or(0),
        }
    }

    /// Run this step against `input`
    pub fn accept(&self, input: &mut T) -> anyhow::Result<()> {
        Step::execute_body(Some(self), input, "", None)
    }

    /// Run a body, numbering its entries under `prefix` for the trace
    pub(crate) fn execute_body(
        step: Option<&Step<T>>,
        input: &mut T,
        prefix: &str,
        mut trace: Option<&mut ExecutionTrace>,
    ) -> anyhow::Result<()> {
        let Some(step) = step else {
            return Ok(());
        };
        for (index, member) in step.members().iter().enumerate() {
            member.execute_at(input, prefix, index, trace.as_deref_mut())?;
        }
        Ok(())
    }

    fn execute_at(
        &self,
        input: &mut T,
        prefix: &str,
        index: usize,
        trace: Option<&mut ExecutionTrace>,
    ) -> anyhow::Result<()> {
        match self {
            Step::Consumer(consumer) => {
                consumer.accept(input)?;
                if let Some(trace) = trace {
                    trace.consumers_invoked += 1;
                }
                Ok(())
            }
            Step::Branch(branch) => branch.execute(input, prefix, index, trace),
            Step::Sequence(_) => Step::execute_body(Some(self), input, prefix, trace),
        }
    }
}

fn flatten_into<T>(steps: Vec<Step<T>>, out: &mut Vec<Step<T>>) {
    for step in steps {
        match step {
            Step::Sequence(inner) => flatten_into(inner, out),
            other => out.push(other),
        }
    }
}

impl<T> From<Configured<dyn Consumer<T>>> for Step<T> {
    fn from(consumer: Configured<dyn Consumer<T>>) -> Self {
        Step::Consumer(consumer)
    }
}

impl<T> From<Branch<T>> for Step<T> {
    fn from(branch: Branch<T>) -> Self {
        Step::Branch(Box::new(branch))
    }
}

impl<T> Clone for Step<T> {
    fn clone(&self) -> Self {
        match self {
            Step::Consumer(consumer) => Step::Consumer(consumer.clone()),
            Step::Branch(branch) => Step::Branch(branch.clone()),
            Step::Sequence(steps) => Step::Sequence(steps.clone()),
        }
    }
}

impl<T> fmt::Debug for Step<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Consumer(consumer) => fmt::Debug::fmt(consumer, f),
            Step::Branch(branch) => fmt::Debug::fmt(branch, f),
            Step::Sequence(steps) => f.debug_list().entries(steps).finish(),
        }
    }
}

impl<T> Consumer<T> for Step<T> {
    fn accept(&self, input: &mut T) -> anyhow::Result<()> {
        Step::accept(self, input)
    }
}
