#![forbid(unsafe_code)]

use miette::Diagnostic;
use thiserror::Error;

use veil_ast::Span;

/// Failures of one tactic application.
///
/// Oracle rejections are not errors: they only shrink candidate streams.
/// Everything here aborts the application and is attributed to a source
/// location the user can act on.
#[derive(Debug, Error, Diagnostic)]
pub enum TacticError {
    /// Wrong argument count/kind for a builtin, missing enclosing loop,
    /// undeclared binding: fatal to the current application.
    #[error("shape error: {message}")]
    #[diagnostic(code(veil::tactic::shape))]
    Shape {
        message: String,
        #[label("in this tactic statement")]
        span: Span,
    },

    /// Every candidate was rejected, or a resolver ran dry with no
    /// sibling branch left. A normal terminal outcome, not a crash.
    #[error("no valid expansion found for tactic call `{tactic}`")]
    #[diagnostic(code(veil::tactic::exhausted))]
    Exhausted {
        tactic: String,
        #[label("this application")]
        span: Span,
    },

    #[error("duplicate tactic declaration `{name}`")]
    #[diagnostic(code(veil::tactic::duplicate))]
    DuplicateTactic {
        name: String,
        #[label("redeclared here")]
        span: Span,
    },

    /// A defect in the engine itself (dispatch gap, impossible state),
    /// never a user error.
    #[error("internal tactic engine error: {message}")]
    #[diagnostic(code(veil::tactic::internal))]
    Internal { message: String },
}

impl TacticError {
    pub fn shape(span: Span, message: impl Into<String>) -> Self {
        TacticError::Shape {
            message: message.into(),
            span,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        TacticError::Internal {
            message: message.into(),
        }
    }

    pub fn arity(span: Span, op: &str, expected: usize, got: usize) -> Self {
        Self::shape(
            span,
            format!("wrong number of arguments for `{op}`: expected {expected}, got {got}"),
        )
    }
}
