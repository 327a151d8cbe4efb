#![forbid(unsafe_code)]

pub mod cases;
pub mod contracts;
pub mod control;
pub mod explore;
pub mod invariant;
pub mod misc;
pub mod rewrite;
pub mod such_that;

use veil_ast::{Expr, Formal, Span, Stmt};

use crate::error::TacticError;
use crate::registry::AtomicOp;
use crate::search::Candidates;
use crate::state::ProofState;
use crate::value::Value;

/// Static dispatch over the closed builtin set. Statement-shaped
/// builtins (`cases`, `if`, `while`, `:|`) are routed by statement kind
/// before this table is consulted.
pub fn dispatch(op: AtomicOp, stmt: &Stmt, state: &ProofState) -> Result<Candidates, TacticError> {
    match op {
        AtomicOp::Precond => contracts::preconditions(stmt, state),
        AtomicOp::Postcond => contracts::postconditions(stmt, state),
        AtomicOp::Params => contracts::params(stmt, state),
        AtomicOp::Returns => contracts::returns(stmt, state),
        AtomicOp::Variables => contracts::variables(stmt, state),
        AtomicOp::Lemmas => contracts::lemmas(stmt, state),
        AtomicOp::CreateInvariant => invariant::create(stmt, state),
        AtomicOp::AddInvariant => invariant::add(stmt, state),
        AtomicOp::LoopGuard => invariant::loop_guard(stmt, state),
        AtomicOp::Explore => explore::resolve(stmt, state),
        AtomicOp::ReplaceOp => rewrite::replace_operator(stmt, state),
        AtomicOp::ReplaceConst => rewrite::replace_constants(stmt, state),
        AtomicOp::Split => rewrite::split(stmt, state),
        AtomicOp::Id => misc::id(stmt, state),
        AtomicOp::Fail => misc::fail(stmt, state),
    }
}

pub(crate) fn require_lv(
    lv: Option<Formal>,
    span: Span,
    op: &str,
) -> Result<Formal, TacticError> {
    lv.ok_or_else(|| {
        TacticError::shape(span, format!("`{op}` requires a variable to bind its result"))
    })
}

pub(crate) fn require_arity(
    op: &str,
    span: Span,
    args: &[Expr],
    expected: usize,
) -> Result<(), TacticError> {
    if args.len() != expected {
        return Err(TacticError::arity(span, op, expected, args.len()));
    }
    Ok(())
}

/// First candidate of an expression resolution, or the expression
/// itself when the resolver yields nothing.
pub(crate) fn first_value(state: &ProofState, expr: &Expr) -> Result<Value, TacticError> {
    match state.resolve_expr(expr)?.next() {
        Some(Ok(v)) => Ok(v),
        Some(Err(e)) => Err(e),
        None => Ok(Value::Expr(expr.clone())),
    }
}
