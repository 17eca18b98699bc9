//! Evaluation capability
//!
//! Workers depend only on the [`Evaluator`] trait; [`ArithmeticEvaluator`] is the
//! default implementation (tokenizer + recursive-descent parser over `f64`).

mod lexer;
mod parser;

pub use lexer::{tokenize, Token, TokenKind};
pub use parser::{parse, BinaryOp, Expr, MAX_DEPTH};

use thiserror::Error;

/// Errors produced while parsing or evaluating an expression
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("expression is empty")]
    Empty,

    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedCharacter { ch: char, position: usize },

    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("unexpected token '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NonFinite,
}

impl EvalError {
    pub(crate) fn unexpected(token: Token) -> Self {
        EvalError::UnexpectedToken {
            token: token.kind.to_string(),
            position: token.position,
        }
    }

    /// Syntax errors are detectable before a task is ever dispatched
    pub fn is_syntax(&self) -> bool {
        !matches!(self, EvalError::DivisionByZero | EvalError::NonFinite)
    }
}

/// Pure function from expression text to a number
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, expression: &str) -> Result<f64, EvalError>;
}

/// Default evaluator for `+ - * /`, unary minus and parentheses
#[derive(Debug, Clone, Copy, Default)]
pub struct ArithmeticEvaluator;

impl Evaluator for ArithmeticEvaluator {
    fn evaluate(&self, expression: &str) -> Result<f64, EvalError> {
        parse(expression)?.eval()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_evaluator() {
        let evaluator = ArithmeticEvaluator;
        assert_eq!(evaluator.evaluate("2 + 2 * 2").unwrap(), 6.0);
        assert_eq!(evaluator.evaluate("(2 + 2) * 2").unwrap(), 8.0);
        assert!(evaluator.evaluate("2 + * 2").is_err());
        assert_eq!(
            evaluator.evaluate("10 / 0").unwrap_err(),
            EvalError::DivisionByZero
        );
    }

    #[test]
    fn test_syntax_classification() {
        assert!(EvalError::UnexpectedEnd.is_syntax());
        assert!(EvalError::Empty.is_syntax());
        assert!(!EvalError::DivisionByZero.is_syntax());
    }

    #[test]
    fn test_evaluator_as_trait_object() {
        let evaluator: Box<dyn Evaluator> = Box::new(ArithmeticEvaluator);
        assert_eq!(evaluator.evaluate("7 - 10").unwrap(), -3.0);
    }
}
