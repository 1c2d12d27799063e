//! Statement executor for parsed resonance blocks

use crate::error::{ResonanceError, Result};
use crate::expr;
use crate::types::{AssignOp, Block, FunctionTable, Scope, Statement};

/// Hardening ceilings applied while a block executes.
///
/// The language itself puts no bound on function-call nesting or on the
/// number of statements a script may run; a self-recursive function would
/// otherwise ride the host stack until it overflows. These ceilings turn
/// that into a clean error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum function-call nesting before `CallDepthExceeded`
    pub max_call_depth: usize,
    /// Optional total statement budget before `StepBudgetExhausted`
    pub max_steps: Option<u64>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_call_depth: 64,
            max_steps: None,
        }
    }
}

/// Walks statement blocks against a mutable scope and the function table
pub struct Executor<'a> {
    functions: &'a FunctionTable,
    limits: Limits,
    steps: u64,
}

impl<'a> Executor<'a> {
    /// Create an executor over a fully populated function table
    pub fn new(functions: &'a FunctionTable, limits: Limits) -> Self {
        Self {
            functions,
            limits,
            steps: 0,
        }
    }

    /// Execute a top-level block
    pub fn execute(&mut self, block: &Block, scope: &mut Scope) -> Result<()> {
        self.execute_block(block, scope, 0)
    }

    fn execute_block(&mut self, block: &Block, scope: &mut Scope, depth: usize) -> Result<()> {
        for statement in block {
            self.count_step()?;
            match statement {
                Statement::Assign { name, op, expr } => {
                    self.execute_assign(name, *op, expr, scope)?;
                }
                Statement::Call { name } => {
                    tracing::debug!("calling function {}", name);
                    let body = self
                        .functions
                        .get(name)
                        .ok_or_else(|| ResonanceError::UnknownFunction(name.clone()))?;
                    if depth + 1 > self.limits.max_call_depth {
                        return Err(ResonanceError::CallDepthExceeded(
                            self.limits.max_call_depth,
                        ));
                    }
                    // same scope, same table: dynamic scoping, no frames
                    self.execute_block(body, scope, depth + 1)?;
                }
                Statement::Conditional {
                    condition,
                    then_block,
                    else_block,
                } => {
                    let branch = if expr::evaluate(condition, scope)?.is_truthy() {
                        then_block
                    } else {
                        else_block
                    };
                    self.execute_block(branch, scope, depth)?;
                }
            }
        }
        Ok(())
    }

    fn execute_assign(
        &mut self,
        name: &str,
        op: AssignOp,
        expression: &str,
        scope: &mut Scope,
    ) -> Result<()> {
        let value = expr::evaluate_number(expression, scope)?;
        let updated = match op {
            AssignOp::Set => value,
            AssignOp::Add => scope.get(name).copied().unwrap_or(0.0) + value,
            AssignOp::Sub => scope.get(name).copied().unwrap_or(0.0) - value,
        };
        scope.insert(name.to_string(), updated);
        Ok(())
    }

    fn count_step(&mut self) -> Result<()> {
        self.steps += 1;
        if let Some(budget) = self.limits.max_steps {
            if self.steps > budget {
                return Err(ResonanceError::StepBudgetExhausted(budget));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse_program;

    fn run(program: &str, scope: &mut Scope) -> Result<()> {
        let tokens = tokenize(program);
        let mut functions = FunctionTable::new();
        let block = parse_program(&tokens, &mut functions)?;
        Executor::new(&functions, Limits::default()).execute(&block, scope)
    }

    #[test]
    fn test_plain_assignment_creates_entry() {
        let mut scope = Scope::new();
        run("y = 3 * 4", &mut scope).unwrap();
        assert_eq!(scope["y"], 12.0);
    }

    #[test]
    fn test_compound_assignment_defaults_absent_to_zero() {
        let mut scope = Scope::new();
        run("x += 1\nz -= 2", &mut scope).unwrap();
        assert_eq!(scope["x"], 1.0);
        assert_eq!(scope["z"], -2.0);
    }

    #[test]
    fn test_conditional_executes_exactly_one_branch() {
        let mut scope = Scope::from([("r".to_string(), 0.8)]);
        run(
            "if r > 0.7 { taken = 1 } else { skipped = 1 }",
            &mut scope,
        )
        .unwrap();
        assert_eq!(scope["taken"], 1.0);
        assert!(!scope.contains_key("skipped"));
    }

    #[test]
    fn test_untaken_branch_is_never_evaluated() {
        // the untaken branch references a missing name; must not error
        let mut scope = Scope::new();
        run("if 1 > 2 { y = missing + 1 } else { y = 7 }", &mut scope).unwrap();
        assert_eq!(scope["y"], 7.0);
    }

    #[test]
    fn test_function_body_mutates_shared_scope() {
        let mut scope = Scope::new();
        run("fn bump { x += 1 }\nbump()\nbump()", &mut scope).unwrap();
        assert_eq!(scope["x"], 2.0);
    }

    #[test]
    fn test_unknown_function_call_errors() {
        let mut scope = Scope::new();
        assert_eq!(
            run("ghost()", &mut scope).unwrap_err(),
            ResonanceError::UnknownFunction("ghost".to_string())
        );
    }

    #[test]
    fn test_self_recursion_hits_depth_ceiling() {
        let mut scope = Scope::new();
        assert_eq!(
            run("fn loop_forever { loop_forever() }\nloop_forever()", &mut scope).unwrap_err(),
            ResonanceError::CallDepthExceeded(64)
        );
    }

    #[test]
    fn test_mutual_recursion_hits_depth_ceiling() {
        let mut scope = Scope::new();
        let program = "fn ping { pong() }\nfn pong { ping() }\nping()";
        assert!(matches!(
            run(program, &mut scope).unwrap_err(),
            ResonanceError::CallDepthExceeded(_)
        ));
    }

    #[test]
    fn test_step_budget() {
        let tokens = tokenize("a = 1\nb = 2\nc = 3");
        let mut functions = FunctionTable::new();
        let block = parse_program(&tokens, &mut functions).unwrap();
        let limits = Limits {
            max_call_depth: 64,
            max_steps: Some(2),
        };
        let mut scope = Scope::new();
        let result = Executor::new(&functions, limits).execute(&block, &mut scope);
        assert_eq!(result.unwrap_err(), ResonanceError::StepBudgetExhausted(2));
        // the two statements inside the budget committed
        assert_eq!(scope["a"], 1.0);
        assert_eq!(scope["b"], 2.0);
        assert!(!scope.contains_key("c"));
    }

    #[test]
    fn test_failure_keeps_earlier_mutations() {
        let mut scope = Scope::new();
        let result = run("a = 1\nb = missing\nc = 3", &mut scope);
        assert_eq!(
            result.unwrap_err(),
            ResonanceError::UnknownName("missing".to_string())
        );
        assert_eq!(scope["a"], 1.0);
        assert!(!scope.contains_key("c"));
    }

    #[test]
    fn test_boolean_result_assigns_as_number() {
        let mut scope = Scope::from([("r".to_string(), 0.8)]);
        run("high = r > 0.7", &mut scope).unwrap();
        assert_eq!(scope["high"], 1.0);
    }
}
