//! Errors raised by the lowering passes and emitters

use crate::ast::Span;
use thiserror::Error;

/// Fatal compilation error. Every variant names the pass (or target) that
/// failed and the offending node.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("{pass}: unsupported construct: {construct}")]
    UnsupportedConstruct {
        pass: &'static str,
        construct: String,
        span: Option<Span>,
    },

    #[error("{pass}: expected {expected}, found {node}")]
    ViolatedPassInvariant {
        pass: &'static str,
        expected: &'static str,
        node: String,
    },

    #[error("{target} emitter cannot render {node}")]
    EmitterMismatch { target: &'static str, node: String },
}

impl CompileError {
    pub fn span(&self) -> Option<&Span> {
        match self {
            CompileError::UnsupportedConstruct { span, .. } => span.as_ref(),
            CompileError::ViolatedPassInvariant { .. } | CompileError::EmitterMismatch { .. } => {
                None
            }
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
