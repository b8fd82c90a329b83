// Conditions - single predicates and allOf/anyOf groups

//! # Conditions
//!
//! A branch tests exactly one [`Condition`], which is either an
//! externally-typed predicate (`condition`) or a [`ConditionGroup`]
//! (`allOf` / `anyOf`). Groups nest arbitrarily.
//!
//! ## Evaluation
//!
//! Members are evaluated in declared order and evaluation short-circuits:
//! - `allOf` stops at the first `false`; an empty `allOf` is **true**
//! - `anyOf` stops at the first `true`; an empty `anyOf` is **false**
//!
//! These are the usual vacuous-truth laws (`Iterator::all` / `Iterator::any`
//! on an empty iterator), kept explicit here because they are easy to invert.

use std::fmt;

use super::contract::{Configured, Predicate};
use super::statement::Statement;

/// A predicate or a group of conditions
pub enum Condition<T> {
    /// `condition`: an externally-typed predicate
    Predicate(Configured<dyn Predicate<T>>),
    /// `allOf` / `anyOf`
    Group(ConditionGroup<T>),
}

impl<T> Condition<T> {
    /// Evaluate against `input`
    pub fn test(&self, input: &T) -> anyhow::Result<bool> {
        match self {
            Condition::Predicate(predicate) => predicate.test(input),
            Condition::Group(group) => group.test(input),
        }
    }

    /// The statement this condition is written as
    pub fn statement(&self) -> Statement {
        match self {
            Condition::Predicate(_) => Statement::Condition,
            Condition::Group(group) => group.statement(),
        }
    }

    /// Nesting depth, counting each group as one level
    pub fn depth(&self) -> usize {
        match self {
            Condition::Predicate(_) => 0,
            Condition::Group(group) => group.depth(),
        }
    }
}

impl<T> From<Configured<dyn Predicate<T>>> for Condition<T> {
    fn from(predicate: Configured<dyn Predicate<T>>) -> Self {
        Condition::Predicate(predicate)
    }
}

impl<T> From<ConditionGroup<T>> for Condition<T> {
    fn from(group: ConditionGroup<T>) -> Self {
        Condition::Group(group)
    }
}

impl<T> Clone for Condition<T> {
    fn clone(&self) -> Self {
        match self {
            Condition::Predicate(predicate) => Condition::Predicate(predicate.clone()),
            Condition::Group(group) => Condition::Group(group.clone()),
        }
    }
}

impl<T> fmt::Debug for Condition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Predicate(predicate) => fmt::Debug::fmt(predicate, f),
            Condition::Group(group) => fmt::Debug::fmt(group, f),
        }
    }
}

impl<T> Predicate<T> for Condition<T> {
    fn test(&self, input: &T) -> anyhow::Result<bool> {
        Condition::test(self, input)
    }
}

/// `allOf` (AND) or `anyOf` (OR) over an ordered list of conditions
pub struct ConditionGroup<T> {
    any: bool,
    members: Vec<Condition<T>>,
}

impl<T> ConditionGroup<T> {
    /// AND group; empty is true
    pub fn all_of(members: Vec<Condition<T>>) -> Self {
        Self { any: false, members }
    }

    /// OR group; empty is false
    pub fn any_of(members: Vec<Condition<T>>) -> Self {
        Self { any: true, members }
    }

    /// Group for `allOf` or `anyOf`; `None` for any other statement
    pub fn for_statement(statement: Statement, members: Vec<Condition<T>>) -> Option<Self> {
        match statement {
            Statement::AllOf => Some(Self::all_of(members)),
            Statement::AnyOf => Some(Self::any_of(members)),
            _ => None,
        }
    }

    /// `true` for `anyOf`
    pub fn is_any(&self) -> bool {
        self.any
    }

    pub fn statement(&self) -> Statement {
        if self.any {
            Statement::AnyOf
        } else {
            Statement::AllOf
        }
    }

    /// Members in declared order
    pub fn members(&self) -> &[Condition<T>] {
        &self.members
    }

    pub fn depth(&self) -> usize {
        1 + self.members.iter().map(Condition::depth).max().unwrap_or(0)
    }

    /// Short-circuit evaluation in declared order
    pub fn test(&self, input: &T) -> anyhow::Result<bool> {
        if self.any {
            for member in &self.members {
                if member.test(input)? {
                    return Ok(true);
                }
            }
            Ok(false)
        } else {
            for member in &self.members {
                if !member.test(input)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
    }
}

impl<T> Clone for ConditionGroup<T> {
    fn clone(&self) -> Self {
        Self {
            any: self.any,
            members: self.members.clone(),
        }
    }
}

impl<T> fmt::Debug for ConditionGroup<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(self.statement().name())
            .field("members", &self.members)
            .finish()
    }
}

impl<T> Predicate<T> for ConditionGroup<T> {
    fn test(&self, input: &T) -> anyhow::Result<bool> {
        ConditionGroup::test(self, input)
    }
}
