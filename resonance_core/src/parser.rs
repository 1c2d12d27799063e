//! Recursive block parser with parse-time function hoisting
//!
//! Function definitions are registered in the function table while the
//! token stream is parsed, before anything executes. A function written
//! inside a conditional branch that never runs is therefore still callable
//! afterwards. This hoisting is contract, not an accident.

use crate::error::{ResonanceError, Result};
use crate::types::{is_valid_identifier, AssignOp, Block, FunctionTable, Statement};

/// Parse a full token stream into a top-level block, registering every
/// `fn` definition encountered into `functions` as a side effect.
pub fn parse_program(tokens: &[String], functions: &mut FunctionTable) -> Result<Block> {
    let mut parser = Parser { tokens, functions };
    let (block, _) = parser.parse_block(0, false)?;
    Ok(block)
}

struct Parser<'a> {
    tokens: &'a [String],
    functions: &'a mut FunctionTable,
}

impl Parser<'_> {
    /// Parse one block starting at `start`, returning it with the index of
    /// the first unconsumed token. `nested` blocks must end with a `}`;
    /// the top-level block ends at end of input instead.
    fn parse_block(&mut self, start: usize, nested: bool) -> Result<(Block, usize)> {
        let mut block = Block::new();
        let mut i = start;

        while i < self.tokens.len() {
            let token = self.tokens[i].trim();
            if token.is_empty() {
                i += 1;
                continue;
            }
            if token.starts_with('}') {
                if !nested {
                    return Err(ResonanceError::UnmatchedBrace(
                        "stray '}' at top level".to_string(),
                    ));
                }
                return Ok((block, i + 1));
            }
            if token == "{" {
                i += 1;
                continue;
            }
            if let Some(rest) = token.strip_prefix("fn ") {
                let name = head_before_brace(rest);
                if !is_valid_identifier(name) {
                    return Err(ResonanceError::InvalidFunctionName(name.to_string()));
                }
                let (body, next) = self.parse_block(i + 1, true)?;
                self.functions.insert(name.to_string(), body);
                i = next;
                continue;
            }
            if let Some(rest) = token.strip_prefix("if ") {
                let condition = head_before_brace(rest).to_string();
                let (then_block, next) = self.parse_block(i + 1, true)?;
                i = next;
                let mut else_block = Block::new();
                if self
                    .tokens
                    .get(i)
                    .is_some_and(|t| t.trim().starts_with("else"))
                {
                    let (parsed, next) = self.parse_block(i + 1, true)?;
                    else_block = parsed;
                    i = next;
                }
                block.push(Statement::Conditional {
                    condition,
                    then_block,
                    else_block,
                });
                continue;
            }
            if token.ends_with('}') {
                // closing noise from lexers that leave braces attached
                i += 1;
                continue;
            }
            block.push(parse_statement(token)?);
            i += 1;
        }

        if nested {
            return Err(ResonanceError::UnmatchedBrace(
                "block is missing a closing '}'".to_string(),
            ));
        }
        Ok((block, i))
    }
}

/// Text up to the first `{`, trimmed; the whole token if no brace is attached
fn head_before_brace(text: &str) -> &str {
    match text.find('{') {
        Some(idx) => text[..idx].trim(),
        None => text.trim(),
    }
}

/// Classify a generic statement line as a call or an assignment
fn parse_statement(line: &str) -> Result<Statement> {
    if let Some(name) = line.strip_suffix("()") {
        let name = name.trim();
        if is_valid_identifier(name) {
            return Ok(Statement::Call {
                name: name.to_string(),
            });
        }
    }

    let (idx, op, op_len) = find_assign_op(line)?;
    let name = line[..idx].trim();
    if !is_valid_identifier(name) {
        return Err(ResonanceError::MalformedStatement(format!(
            "bad assignment target in '{line}'"
        )));
    }
    let expr = line[idx + op_len..].trim();
    Ok(Statement::Assign {
        name: name.to_string(),
        op,
        expr: expr.to_string(),
    })
}

/// Locate the single assignment operator on a line.
///
/// `==`, `!=`, `<=`, and `>=` never count as assignment. Zero operators or
/// more than one is a parse error: the line is ambiguous.
fn find_assign_op(line: &str) -> Result<(usize, AssignOp, usize)> {
    let bytes = line.as_bytes();
    let mut found: Option<(usize, AssignOp, usize)> = None;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'=' {
            i += 1;
            continue;
        }
        // comparison operators own their '='
        if bytes.get(i + 1) == Some(&b'=') {
            i += 2;
            continue;
        }
        if i > 0 && matches!(bytes[i - 1], b'!' | b'<' | b'>') {
            i += 1;
            continue;
        }
        let (idx, op, len) = if i > 0 && bytes[i - 1] == b'+' {
            (i - 1, AssignOp::Add, 2)
        } else if i > 0 && bytes[i - 1] == b'-' {
            (i - 1, AssignOp::Sub, 2)
        } else {
            (i, AssignOp::Set, 1)
        };
        if found.is_some() {
            return Err(ResonanceError::MalformedStatement(format!(
                "more than one assignment operator in '{line}'"
            )));
        }
        found = Some((idx, op, len));
        i += 1;
    }

    found.ok_or_else(|| {
        ResonanceError::MalformedStatement(format!("not a call or assignment: '{line}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(program: &str) -> Result<(Block, FunctionTable)> {
        let tokens = tokenize(program);
        let mut functions = FunctionTable::new();
        let block = parse_program(&tokens, &mut functions)?;
        Ok((block, functions))
    }

    #[test]
    fn test_assignment_kinds() {
        let (block, _) = parse("K = 1\ntok += 32\nmass -= 0.1").unwrap();
        assert_eq!(
            block,
            vec![
                Statement::Assign {
                    name: "K".to_string(),
                    op: AssignOp::Set,
                    expr: "1".to_string(),
                },
                Statement::Assign {
                    name: "tok".to_string(),
                    op: AssignOp::Add,
                    expr: "32".to_string(),
                },
                Statement::Assign {
                    name: "mass".to_string(),
                    op: AssignOp::Sub,
                    expr: "0.1".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_comparison_inside_assignment_expression() {
        let (block, _) = parse("flag = r >= 0.7").unwrap();
        assert_eq!(
            block,
            vec![Statement::Assign {
                name: "flag".to_string(),
                op: AssignOp::Set,
                expr: "r >= 0.7".to_string(),
            }]
        );
    }

    #[test]
    fn test_conditional_with_else() {
        let (block, _) = parse("if r > 0.7 { K = K - 0.05 } else { K = K + 0.05 }").unwrap();
        match &block[..] {
            [Statement::Conditional {
                condition,
                then_block,
                else_block,
            }] => {
                assert_eq!(condition, "r > 0.7");
                assert_eq!(then_block.len(), 1);
                assert_eq!(else_block.len(), 1);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn test_conditional_without_else() {
        let (block, _) = parse("if tok > 0 {\n tok -= 1 \n}").unwrap();
        match &block[..] {
            [Statement::Conditional { else_block, .. }] => assert!(else_block.is_empty()),
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn test_function_definition_is_hoisted_not_appended() {
        let (block, functions) = parse("fn bump { x += 1 }\nbump()").unwrap();
        assert_eq!(functions.len(), 1);
        assert_eq!(
            functions["bump"],
            vec![Statement::Assign {
                name: "x".to_string(),
                op: AssignOp::Add,
                expr: "1".to_string(),
            }]
        );
        // the definition itself leaves no statement behind
        assert_eq!(
            block,
            vec![Statement::Call {
                name: "bump".to_string(),
            }]
        );
    }

    #[test]
    fn test_function_inside_untaken_branch_is_still_registered() {
        let program = "if 1 > 2 {\n fn hidden { y = 5 }\n}";
        let (_, functions) = parse(program).unwrap();
        assert!(functions.contains_key("hidden"));
    }

    #[test]
    fn test_call_to_later_function_parses() {
        let (block, functions) = parse("bump()\nfn bump { x += 1 }").unwrap();
        assert_eq!(
            block,
            vec![Statement::Call {
                name: "bump".to_string(),
            }]
        );
        assert!(functions.contains_key("bump"));
    }

    #[test]
    fn test_invalid_function_name() {
        assert_eq!(
            parse("fn 2fast { x = 1 }").unwrap_err(),
            ResonanceError::InvalidFunctionName("2fast".to_string())
        );
        assert!(matches!(
            parse("fn bad name { x = 1 }").unwrap_err(),
            ResonanceError::InvalidFunctionName(_)
        ));
    }

    #[test]
    fn test_unmatched_braces() {
        assert!(matches!(
            parse("if r > 0.7 {\n K = 1\n").unwrap_err(),
            ResonanceError::UnmatchedBrace(_)
        ));
        assert!(matches!(
            parse("K = 1\n}\n").unwrap_err(),
            ResonanceError::UnmatchedBrace(_)
        ));
    }

    #[test]
    fn test_ambiguous_assignment_is_rejected() {
        assert!(matches!(
            parse("x = 1 = 2").unwrap_err(),
            ResonanceError::MalformedStatement(_)
        ));
        assert!(matches!(
            parse("x += y -= 1").unwrap_err(),
            ResonanceError::MalformedStatement(_)
        ));
    }

    #[test]
    fn test_line_without_operator_is_rejected() {
        assert!(matches!(
            parse("just words").unwrap_err(),
            ResonanceError::MalformedStatement(_)
        ));
    }

    #[test]
    fn test_redefinition_overwrites() {
        let (_, functions) = parse("fn f { x = 1 }\nfn f { x = 2 }").unwrap();
        assert_eq!(
            functions["f"],
            vec![Statement::Assign {
                name: "x".to_string(),
                op: AssignOp::Set,
                expr: "2".to_string(),
            }]
        );
    }

    #[test]
    fn test_nested_conditionals() {
        let program = "if a > 0 {\n if b > 0 {\n c = 1\n } else {\n c = 2\n }\n}";
        let (block, _) = parse(program).unwrap();
        match &block[..] {
            [Statement::Conditional { then_block, .. }] => {
                assert!(matches!(then_block[..], [Statement::Conditional { .. }]));
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }
}
