//! Error types for the resonance interpreter

use thiserror::Error;

/// Result type for resonance operations
pub type Result<T> = std::result::Result<T, ResonanceError>;

/// Errors raised while parsing or executing a resonance script
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResonanceError {
    /// Malformed program structure
    #[error("Parse error: {0}")]
    Parse(String),

    /// Function name does not match the identifier grammar
    #[error("Invalid function name: {0}")]
    InvalidFunctionName(String),

    /// A `{` without a closing `}`, or a stray `}` at the top level
    #[error("Unmatched brace: {0}")]
    UnmatchedBrace(String),

    /// A statement line that is neither a call nor a single assignment
    #[error("Malformed statement: {0}")]
    MalformedStatement(String),

    /// Expression references a name absent from the scope
    #[error("Unknown name {0}")]
    UnknownName(String),

    /// Expression calls anything outside the builtin whitelist
    #[error("Unsafe call: {0}")]
    UnsafeCall(String),

    /// Expression uses a token or shape outside the closed grammar
    #[error("Unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// Division or modulo with a zero right-hand side
    #[error("Division by zero")]
    DivisionByZero,

    /// Call statement names a function absent from the function table
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Function-call nesting exceeded the configured ceiling
    #[error("Call depth exceeded: limit is {0}")]
    CallDepthExceeded(usize),

    /// Statement budget exhausted before the program finished
    #[error("Step budget exhausted: limit is {0}")]
    StepBudgetExhausted(u64),
}
