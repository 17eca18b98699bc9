//! Recursive-descent parser producing an expression tree
//!
//! Grammar (standard precedence, left associative):
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := '-' factor | NUMBER | '(' expr ')'
//! ```
//!
//! Operator runs at one precedence level become a single [`Expr::Chain`] node,
//! so tree depth grows only with parentheses and unary minus. Both are capped
//! by [`MAX_DEPTH`], which keeps parsing, evaluation and drop bounded in stack
//! use regardless of input length.

use super::lexer::{tokenize, Token, TokenKind};
use super::EvalError;

/// Parenthesis / unary nesting limit
pub const MAX_DEPTH: usize = 256;

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn apply(self, lhs: f64, rhs: f64) -> Result<f64, EvalError> {
        let value = match self {
            Self::Add => lhs + rhs,
            Self::Sub => lhs - rhs,
            Self::Mul => lhs * rhs,
            Self::Div => {
                if rhs == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                lhs / rhs
            }
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(EvalError::NonFinite)
        }
    }
}

/// Parsed expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Neg(Box<Expr>),
    /// `first op1 x1 op2 x2 ...`, folded left to right
    Chain {
        first: Box<Expr>,
        rest: Vec<(BinaryOp, Expr)>,
    },
}

impl Expr {
    /// Evaluate the tree
    pub fn eval(&self) -> Result<f64, EvalError> {
        match self {
            Expr::Number(n) => Ok(*n),
            Expr::Neg(inner) => Ok(-inner.eval()?),
            Expr::Chain { first, rest } => rest
                .iter()
                .try_fold(first.eval()?, |acc, (op, rhs)| op.apply(acc, rhs.eval()?)),
        }
    }
}

/// Parse an expression string into a tree without evaluating it
pub fn parse(input: &str) -> Result<Expr, EvalError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(EvalError::Empty);
    }

    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;

    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(EvalError::unexpected(token)),
    }
}

fn chain(first: Expr, rest: Vec<(BinaryOp, Expr)>) -> Expr {
    if rest.is_empty() {
        first
    } else {
        Expr::Chain {
            first: Box::new(first),
            rest,
        }
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expr(&mut self) -> Result<Expr, EvalError> {
        let first = self.term()?;
        let mut rest = Vec::new();
        while let Some(token) = self.peek() {
            let op = match token.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            rest.push((op, self.term()?));
        }
        Ok(chain(first, rest))
    }

    fn term(&mut self) -> Result<Expr, EvalError> {
        let first = self.factor()?;
        let mut rest = Vec::new();
        while let Some(token) = self.peek() {
            let op = match token.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            self.pos += 1;
            rest.push((op, self.factor()?));
        }
        Ok(chain(first, rest))
    }

    fn factor(&mut self) -> Result<Expr, EvalError> {
        let token = self.advance().ok_or(EvalError::UnexpectedEnd)?;
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::Minus => {
                self.enter()?;
                let inner = self.factor()?;
                self.depth -= 1;
                Ok(Expr::Neg(Box::new(inner)))
            }
            TokenKind::LParen => {
                self.enter()?;
                let inner = self.expr()?;
                self.depth -= 1;
                match self.advance() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => Ok(inner),
                    Some(other) => Err(EvalError::unexpected(other)),
                    None => Err(EvalError::UnexpectedEnd),
                }
            }
            _ => Err(EvalError::unexpected(token)),
        }
    }

    fn enter(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvalError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }
}
