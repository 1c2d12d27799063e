//! Type definitions for resonance programs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Named numeric environment shared by a whole script, function bodies included
pub type Scope = HashMap<String, f64>;

/// Registry of named zero-argument procedure bodies, owned by the controller
pub type FunctionTable = HashMap<String, Block>;

/// Ordered sequence of statements
pub type Block = Vec<Statement>;

/// A single parsed statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// Assignment or compound assignment to a scope entry
    Assign {
        /// Target name in the scope
        name: String,
        /// Plain or compound operator
        op: AssignOp,
        /// Right-hand side, kept as text and evaluated at execution time
        expr: String,
    },

    /// Zero-argument call of a named function
    Call {
        /// Function name, resolved against the table at execution time
        name: String,
    },

    /// Two-way conditional
    Conditional {
        /// Condition text, evaluated at execution time
        condition: String,
        /// Branch taken when the condition is truthy
        then_block: Block,
        /// Branch taken otherwise; empty when no `else` was written
        else_block: Block,
    },
}

/// Assignment operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    /// `=` creates or overwrites unconditionally
    Set,
    /// `+=` treats an absent target as 0.0
    Add,
    /// `-=` treats an absent target as 0.0
    Sub,
}

/// Transient result of evaluating an expression
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
}

impl Value {
    /// Check if value is truthy (nonzero number or `true`)
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
        }
    }

    /// Get as a number, coercing booleans to 1.0/0.0
    pub fn as_number(&self) -> f64 {
        match self {
            Value::Bool(true) => 1.0,
            Value::Bool(false) => 0.0,
            Value::Number(n) => *n,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Check a name against the identifier grammar `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
