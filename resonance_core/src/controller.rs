//! Resonance script entry point
//!
//! `ResonanceController` is the long-lived owner of the function table:
//! a function defined during one `run` stays callable in every later `run`
//! on the same controller. Block trees themselves are rebuilt from source
//! on each call and never cached.

use crate::error::Result;
use crate::executor::{Executor, Limits};
use crate::lexer::tokenize;
use crate::parser::parse_program;
use crate::types::{FunctionTable, Scope};

/// Runtime for resonance scripts programming macro-layer behavior
pub struct ResonanceController {
    functions: FunctionTable,
    limits: Limits,
}

impl ResonanceController {
    /// Create a controller with default hardening limits
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    /// Create a controller with custom limits
    pub fn with_limits(limits: Limits) -> Self {
        Self {
            functions: FunctionTable::new(),
            limits,
        }
    }

    /// Names currently registered in the function table
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Run a script against the caller's scope, mutating it in place.
    ///
    /// An empty or whitespace-only program is a no-op. Parsing registers
    /// every `fn` definition into the persistent table before anything
    /// executes, so a parse error leaves the scope untouched; an execution
    /// error keeps the effects of statements that ran before it.
    ///
    /// The controller does no internal locking: callers must not invoke
    /// `run` concurrently on the same instance.
    pub fn run(&mut self, program: &str, scope: &mut Scope) -> Result<()> {
        if program.trim().is_empty() {
            return Ok(());
        }
        let tokens = tokenize(program);
        tracing::debug!("running resonance script, {} tokens", tokens.len());
        let block = parse_program(&tokens, &mut self.functions)?;
        Executor::new(&self.functions, self.limits).execute(&block, scope)
    }
}

impl Default for ResonanceController {
    fn default() -> Self {
        Self::new()
    }
}
