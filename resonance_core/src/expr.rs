//! Closed-grammar expression evaluation
//!
//! Expressions are parsed by a self-contained recursive-descent parser into
//! a fixed set of node kinds and evaluated by tree-walking against the
//! scope. Anything outside the grammar is rejected while parsing, never
//! coerced or deferred to execution.

use crate::error::{ResonanceError, Result};
use crate::types::{Scope, Value};

/// Evaluate an expression string against a scope.
///
/// Grammar, lowest precedence first: `or`/`and` connectives, one optional
/// comparison, additive, multiplicative, unary sign, atoms (number,
/// identifier, whitelisted call, parenthesized expression). The only
/// callable names are `min`, `max`, and `abs`.
pub fn evaluate(expr: &str, scope: &Scope) -> Result<Value> {
    let tokens = scan(expr)?;
    let tree = Parser::new(tokens).parse()?;
    eval(&tree, scope)
}

/// Evaluate an expression and coerce the result to a number
pub fn evaluate_number(expr: &str, scope: &Scope) -> Result<f64> {
    Ok(evaluate(expr, scope)?.as_number())
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    And,
    Or,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Lt,
    Gt,
    Le,
    Ge,
    EqEq,
    NotEq,
    LParen,
    RParen,
    Comma,
}

/// Scan an expression into tokens, rejecting any character outside the grammar
fn scan(expr: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = expr.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let number = text.parse::<f64>().map_err(|_| {
                    ResonanceError::UnsupportedExpression(format!("bad number literal '{text}'"))
                })?;
                tokens.push(Token::Number(number));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let name: String = chars[start..i].iter().collect();
                tokens.push(match name.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    _ => Token::Ident(name),
                });
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::EqEq);
                    i += 2;
                } else {
                    return Err(ResonanceError::UnsupportedExpression(
                        "assignment is not an expression".to_string(),
                    ));
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::NotEq);
                    i += 2;
                } else {
                    return Err(ResonanceError::UnsupportedExpression(
                        "unexpected character '!'".to_string(),
                    ));
                }
            }
            other => {
                return Err(ResonanceError::UnsupportedExpression(format!(
                    "unexpected character '{other}'"
                )));
            }
        }
    }

    Ok(tokens)
}

/// Transient expression tree; the closed set of representable node kinds
#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Name(String),
    Unary {
        negate: bool,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Connective {
        op: BoolOp,
        operands: Vec<Expr>,
    },
    Call {
        builtin: Builtin,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CompareOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BoolOp {
    And,
    Or,
}

/// The whitelisted builtin functions
#[derive(Debug, Clone, Copy, PartialEq)]
enum Builtin {
    Min,
    Max,
    Abs,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse a full expression; trailing tokens are an error
    fn parse(mut self) -> Result<Expr> {
        let expr = self.parse_or()?;
        if self.pos < self.tokens.len() {
            return Err(ResonanceError::UnsupportedExpression(
                "trailing input after expression".to_string(),
            ));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn match_token(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut operands = vec![self.parse_and()?];
        while self.match_token(&Token::Or) {
            operands.push(self.parse_and()?);
        }
        if operands.len() == 1 {
            Ok(operands.remove(0))
        } else {
            Ok(Expr::Connective {
                op: BoolOp::Or,
                operands,
            })
        }
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut operands = vec![self.parse_comparison()?];
        while self.match_token(&Token::And) {
            operands.push(self.parse_comparison()?);
        }
        if operands.len() == 1 {
            Ok(operands.remove(0))
        } else {
            Ok(Expr::Connective {
                op: BoolOp::And,
                operands,
            })
        }
    }

    /// At most one comparison per expression; chaining is rejected
    fn parse_comparison(&mut self) -> Result<Expr> {
        let lhs = self.parse_additive()?;
        let op = match self.peek() {
            Some(Token::Lt) => CompareOp::Lt,
            Some(Token::Gt) => CompareOp::Gt,
            Some(Token::Le) => CompareOp::Le,
            Some(Token::Ge) => CompareOp::Ge,
            Some(Token::EqEq) => CompareOp::Eq,
            Some(Token::NotEq) => CompareOp::Ne,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.parse_additive()?;
        if matches!(
            self.peek(),
            Some(Token::Lt)
                | Some(Token::Gt)
                | Some(Token::Le)
                | Some(Token::Ge)
                | Some(Token::EqEq)
                | Some(Token::NotEq)
        ) {
            return Err(ResonanceError::UnsupportedExpression(
                "chained comparison".to_string(),
            ));
        }
        Ok(Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut expr = self.parse_multiplicative()?;
        loop {
            let op = if self.match_token(&Token::Plus) {
                BinaryOp::Add
            } else if self.match_token(&Token::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };
            let rhs = self.parse_multiplicative()?;
            expr = Expr::Binary {
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = if self.match_token(&Token::Star) {
                BinaryOp::Mul
            } else if self.match_token(&Token::Slash) {
                BinaryOp::Div
            } else if self.match_token(&Token::Percent) {
                BinaryOp::Mod
            } else {
                break;
            };
            let rhs = self.parse_unary()?;
            expr = Expr::Binary {
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.match_token(&Token::Minus) {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                negate: true,
                operand: Box::new(operand),
            });
        }
        if self.match_token(&Token::Plus) {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                negate: false,
                operand: Box::new(operand),
            });
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<Expr> {
        match self.peek().cloned() {
            Some(Token::Number(n)) => {
                self.pos += 1;
                Ok(Expr::Number(n))
            }
            Some(Token::Ident(name)) => {
                self.pos += 1;
                if self.match_token(&Token::LParen) {
                    self.parse_call(&name)
                } else {
                    Ok(Expr::Name(name))
                }
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let expr = self.parse_or()?;
                if !self.match_token(&Token::RParen) {
                    return Err(ResonanceError::UnsupportedExpression(
                        "missing closing ')'".to_string(),
                    ));
                }
                Ok(expr)
            }
            _ => Err(ResonanceError::UnsupportedExpression(
                "expected a number, name, or '('".to_string(),
            )),
        }
    }

    /// Call arguments after the opening paren; callee must be whitelisted
    fn parse_call(&mut self, name: &str) -> Result<Expr> {
        let builtin = match name {
            "min" => Builtin::Min,
            "max" => Builtin::Max,
            "abs" => Builtin::Abs,
            other => return Err(ResonanceError::UnsafeCall(other.to_string())),
        };

        let mut args = vec![self.parse_or()?];
        while self.match_token(&Token::Comma) {
            args.push(self.parse_or()?);
        }
        if !self.match_token(&Token::RParen) {
            return Err(ResonanceError::UnsupportedExpression(
                "missing closing ')' after call arguments".to_string(),
            ));
        }

        match builtin {
            Builtin::Abs if args.len() != 1 => Err(ResonanceError::UnsupportedExpression(
                "abs expects exactly one argument".to_string(),
            )),
            Builtin::Min | Builtin::Max if args.len() < 2 => {
                Err(ResonanceError::UnsupportedExpression(format!(
                    "{name} expects at least two arguments"
                )))
            }
            _ => Ok(Expr::Call { builtin, args }),
        }
    }
}

/// Tree-walk an expression against the scope
fn eval(expr: &Expr, scope: &Scope) -> Result<Value> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Name(name) => scope
            .get(name)
            .copied()
            .map(Value::Number)
            .ok_or_else(|| ResonanceError::UnknownName(name.clone())),
        Expr::Unary { negate, operand } => {
            let value = eval(operand, scope)?.as_number();
            Ok(Value::Number(if *negate { -value } else { value }))
        }
        Expr::Binary { op, lhs, rhs } => {
            let left = eval(lhs, scope)?.as_number();
            let right = eval(rhs, scope)?.as_number();
            let result = match op {
                BinaryOp::Add => left + right,
                BinaryOp::Sub => left - right,
                BinaryOp::Mul => left * right,
                BinaryOp::Div => {
                    if right == 0.0 {
                        return Err(ResonanceError::DivisionByZero);
                    }
                    left / right
                }
                BinaryOp::Mod => {
                    if right == 0.0 {
                        return Err(ResonanceError::DivisionByZero);
                    }
                    left % right
                }
            };
            Ok(Value::Number(result))
        }
        Expr::Compare { op, lhs, rhs } => {
            let left = eval(lhs, scope)?.as_number();
            let right = eval(rhs, scope)?.as_number();
            let result = match op {
                CompareOp::Lt => left < right,
                CompareOp::Gt => left > right,
                CompareOp::Le => left <= right,
                CompareOp::Ge => left >= right,
                CompareOp::Eq => left == right,
                CompareOp::Ne => left != right,
            };
            Ok(Value::Bool(result))
        }
        Expr::Connective { op, operands } => {
            // no short-circuit needed: expressions are side-effect free
            let mut values = Vec::with_capacity(operands.len());
            for operand in operands {
                values.push(eval(operand, scope)?.is_truthy());
            }
            let result = match op {
                BoolOp::And => values.iter().all(|v| *v),
                BoolOp::Or => values.iter().any(|v| *v),
            };
            Ok(Value::Bool(result))
        }
        Expr::Call { builtin, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval(arg, scope)?.as_number());
            }
            let result = match builtin {
                Builtin::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
                Builtin::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                Builtin::Abs => values[0].abs(),
            };
            Ok(Value::Number(result))
        }
    }
}
