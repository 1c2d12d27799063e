//! Resonance Core
//!
//! Sandboxed interpreter for resonance scripts: the small restricted
//! control language the Athena AI-O engine uses to post-process its named
//! numeric budgets and metrics each cycle. The grammar is deliberately
//! closed — conditionals, zero-argument named procedures, and arithmetic
//! or compound assignment over one shared numeric scope, with `min`, `max`,
//! and `abs` as the only callable builtins. Nothing in a script can reach
//! host capabilities.

pub mod controller;
pub mod error;
pub mod executor;
pub mod expr;
pub mod lexer;
pub mod parser;
pub mod types;

pub use controller::ResonanceController;
pub use error::{ResonanceError, Result};
pub use executor::Limits;
pub use types::{AssignOp, Block, FunctionTable, Scope, Statement, Value};
