// Statement grammar - the closed set of flow node kinds

//! # Statements
//!
//! A flow document is a tree whose tags are drawn from seven statements:
//!
//! | Statement   | Role                                   | Permitted children                         |
//! |-------------|----------------------------------------|--------------------------------------------|
//! | `if`        | branch on a condition                  | one condition, one `then`, optional `else` |
//! | `ifNot`     | branch on the negated condition        | same as `if`                               |
//! | `allOf`     | AND group                              | `condition`, `allOf`, `anyOf`              |
//! | `anyOf`     | OR group                               | `condition`, `allOf`, `anyOf`              |
//! | `condition` | externally-typed predicate             | the predicate's own fields                 |
//! | `then`      | body run when the condition holds      | `if`, `ifNot`, consumers                   |
//! | `else`      | body run otherwise                     | `if`, `ifNot`, consumers                   |
//!
//! Names are matched exactly and case-sensitively. Any other tag inside a body
//! is a consumer discriminator; anywhere else it is a structural error.
//!
//! ## Rust Learning Notes:
//!
//! ### Closed Enums Instead of Open Dispatch
//! The reader and writer `match` on `Statement`, so adding a variant would
//! force every dispatch site to handle it at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the seven grammar symbols of a flow document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Statement {
    #[serde(rename = "if")]
    If,
    #[serde(rename = "ifNot")]
    IfNot,
    #[serde(rename = "allOf")]
    AllOf,
    #[serde(rename = "anyOf")]
    AnyOf,
    #[serde(rename = "condition")]
    Condition,
    #[serde(rename = "then")]
    Then,
    #[serde(rename = "else")]
    Else,
}

impl Statement {
    /// Every statement, in grammar order
    pub const ALL: [Statement; 7] = [
        Statement::If,
        Statement::IfNot,
        Statement::AllOf,
        Statement::AnyOf,
        Statement::Condition,
        Statement::Then,
        Statement::Else,
    ];

    /// Canonical tag used in configuration trees
    pub fn name(self) -> &'static str {
        match self {
            Statement::If => "if",
            Statement::IfNot => "ifNot",
            Statement::AllOf => "allOf",
            Statement::AnyOf => "anyOf",
            Statement::Condition => "condition",
            Statement::Then => "then",
            Statement::Else => "else",
        }
    }

    /// Resolve a tag to its statement
    ///
    /// Exact, case-sensitive match: `"IF"` and `"ifnot"` are not statements.
    pub fn lookup(name: &str) -> Option<Statement> {
        match name {
            "if" => Some(Statement::If),
            "ifNot" => Some(Statement::IfNot),
            "allOf" => Some(Statement::AllOf),
            "anyOf" => Some(Statement::AnyOf),
            "condition" => Some(Statement::Condition),
            "then" => Some(Statement::Then),
            "else" => Some(Statement::Else),
            _ => None,
        }
    }

    /// `condition`, `allOf` and `anyOf` all produce a predicate
    pub fn is_condition(self) -> bool {
        matches!(
            self,
            Statement::Condition | Statement::AllOf | Statement::AnyOf
        )
    }

    /// `if` and `ifNot`
    pub fn is_branch(self) -> bool {
        matches!(self, Statement::If | Statement::IfNot)
    }

    /// `then` and `else`
    pub fn is_body(self) -> bool {
        matches!(self, Statement::Then | Statement::Else)
    }

    /// Statements allowed as direct children
    ///
    /// Bodies additionally accept consumers, which are not statements.
    pub fn permitted_children(self) -> &'static [Statement] {
        match self {
            Statement::If | Statement::IfNot => &[
                Statement::Condition,
                Statement::AllOf,
                Statement::AnyOf,
                Statement::Then,
                Statement::Else,
            ],
            Statement::AllOf | Statement::AnyOf => {
                &[Statement::Condition, Statement::AllOf, Statement::AnyOf]
            }
            Statement::Then | Statement::Else => &[Statement::If, Statement::IfNot],
            Statement::Condition => &[],
        }
    }

    /// One-line summary used by the CLI
    pub fn summary(self) -> &'static str {
        match self {
            Statement::If => "run 'then' when the condition holds, otherwise 'else'",
            Statement::IfNot => "run 'then' when the condition does not hold, otherwise 'else'",
            Statement::AllOf => "true when every member is true (empty: true)",
            Statement::AnyOf => "true when any member is true (empty: false)",
            Statement::Condition => "externally-typed predicate selected by its type discriminator",
            Statement::Then => "consumers and branches run when the branch is taken",
            Statement::Else => "consumers and branches run when the branch is not taken",
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
