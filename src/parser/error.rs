//! Parser error types

use crate::ast::Span;
use crate::lexer::Token;
use thiserror::Error;

/// Parser error types with source location information
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected token: expected {expected}, found {found:?}")]
    UnexpectedToken {
        expected: String,
        found: Token,
        span: Span,
    },

    #[error("unexpected end of file: expected {expected}")]
    UnexpectedEof { expected: String, last_span: Span },

    #[error("cannot assign to {what}")]
    InvalidTarget { what: &'static str, span: Span },
}

impl ParseError {
    pub fn span(&self) -> &Span {
        match self {
            ParseError::UnexpectedToken { span, .. } => span,
            ParseError::UnexpectedEof { last_span, .. } => last_span,
            ParseError::InvalidTarget { span, .. } => span,
        }
    }

    /// Build the error for an unexpected token, turning `Eof` into `UnexpectedEof`
    pub fn unexpected(expected: impl Into<String>, found: Token, span: Span) -> Self {
        match found {
            Token::Eof => ParseError::UnexpectedEof {
                expected: expected.into(),
                last_span: span,
            },
            found => ParseError::UnexpectedToken {
                expected: expected.into(),
                found,
                span,
            },
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
