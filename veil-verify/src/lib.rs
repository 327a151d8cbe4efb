#![forbid(unsafe_code)]

use std::sync::{Arc, Mutex};

use miette::Diagnostic;
use thiserror::Error;

use veil_ast::{Program, Span};

#[derive(Debug, Error, Diagnostic)]
#[error("resolution error: {message}")]
#[diagnostic(code(veil::verify::resolve))]
pub struct ResolveError {
    pub message: String,
    #[label]
    pub span: Option<Span>,
}

/// First verification failure of a run, used to steer case-split
/// refinement toward the failing arm.
#[derive(Clone, Debug, PartialEq)]
pub struct VerifyFailure {
    pub span: Span,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VerifyOutcome {
    pub errors: usize,
    pub first_error: Option<VerifyFailure>,
}

impl VerifyOutcome {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failed(span: Span, message: impl Into<String>) -> Self {
        Self {
            errors: 1,
            first_error: Some(VerifyFailure {
                span,
                message: message.into(),
            }),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// The external verification oracle.
///
/// The engine treats any nonzero error count as rejection; only the
/// case-split resolver looks at `first_error`.
pub trait Oracle {
    fn resolve_and_typecheck(&mut self, program: &Program) -> Result<(), ResolveError>;

    fn verify(&mut self, program: &Program) -> VerifyOutcome;
}

/// Oracle that accepts every program. Stands in for a real verifier on
/// machines without one, and anchors tests that exercise search shape
/// rather than verification outcomes.
#[derive(Debug, Default)]
pub struct AcceptAllOracle;

impl Oracle for AcceptAllOracle {
    fn resolve_and_typecheck(&mut self, _program: &Program) -> Result<(), ResolveError> {
        Ok(())
    }

    fn verify(&mut self, _program: &Program) -> VerifyOutcome {
        VerifyOutcome::ok()
    }
}

/// Oracle driven by a verdict function over the formatted program text.
///
/// Records every submission so tests can assert how many candidates the
/// search actually verified.
pub struct ScriptedOracle {
    verdict: Box<dyn FnMut(&Program, usize) -> VerifyOutcome + Send>,
    submissions: Vec<String>,
}

impl ScriptedOracle {
    pub fn new(verdict: impl FnMut(&Program, usize) -> VerifyOutcome + Send + 'static) -> Self {
        Self {
            verdict: Box::new(verdict),
            submissions: Vec::new(),
        }
    }

    /// Fixed verdict sequence; once the script runs out every further
    /// submission is accepted.
    pub fn from_script(script: Vec<VerifyOutcome>) -> Self {
        let mut script = script.into_iter();
        Self::new(move |_, _| script.next().unwrap_or_else(VerifyOutcome::ok))
    }

    pub fn submissions(&self) -> &[String] {
        &self.submissions
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.len()
    }
}

impl Oracle for ScriptedOracle {
    fn resolve_and_typecheck(&mut self, _program: &Program) -> Result<(), ResolveError> {
        Ok(())
    }

    fn verify(&mut self, program: &Program) -> VerifyOutcome {
        let n = self.submissions.len();
        self.submissions.push(veil_ast::format_program(program));
        (self.verdict)(program, n)
    }
}

/// Shared handle to one oracle instance.
///
/// The oracle is a singleton-like external resource with internal global
/// state, so every call goes through a single critical section. Nothing
/// else in a resolution session is shared mutable state.
pub struct SharedOracle {
    inner: Arc<Mutex<dyn Oracle + Send>>,
}

impl Clone for SharedOracle {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl SharedOracle {
    pub fn new(oracle: impl Oracle + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(oracle)),
        }
    }

    /// Wrap an oracle the caller keeps a handle to (tests inspect the
    /// concrete oracle after a run this way).
    pub fn from_arc(inner: Arc<Mutex<dyn Oracle + Send>>) -> Self {
        Self { inner }
    }

    pub fn resolve_and_typecheck(&self, program: &Program) -> Result<(), ResolveError> {
        let mut guard = self.inner.lock().expect("oracle lock poisoned");
        guard.resolve_and_typecheck(program)
    }

    pub fn verify(&self, program: &Program) -> VerifyOutcome {
        let mut guard = self.inner.lock().expect("oracle lock poisoned");
        guard.verify(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_ast::{span, Program};

    #[test]
    fn scripted_oracle_replays_verdicts_then_accepts() {
        let mut oracle = ScriptedOracle::from_script(vec![
            VerifyOutcome::failed(span(1, 1), "no"),
            VerifyOutcome::ok(),
        ]);
        let prog = Program { decls: vec![] };
        assert_eq!(oracle.verify(&prog).errors, 1);
        assert!(oracle.verify(&prog).is_ok());
        assert!(oracle.verify(&prog).is_ok());
        assert_eq!(oracle.submission_count(), 3);
    }

    #[test]
    fn shared_oracle_serializes_access() {
        let shared = SharedOracle::new(AcceptAllOracle);
        let prog = Program { decls: vec![] };
        let other = shared.clone();
        assert!(shared.verify(&prog).is_ok());
        assert!(other.verify(&prog).is_ok());
    }
}
