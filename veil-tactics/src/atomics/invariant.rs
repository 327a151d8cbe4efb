#![forbid(unsafe_code)]

use veil_ast::{same_site, Stmt, WhileStmt};

use crate::atomics::{require_arity, require_lv};
use crate::error::TacticError;
use crate::search::Candidates;
use crate::solution::Solution;
use crate::state::{init_args, one, ProofState};
use crate::value::Value;

/// `i := create_invariant(f)`: wrap a resolved formula as an invariant
/// value bound to a tactic local.
pub fn create(stmt: &Stmt, state: &ProofState) -> Result<Candidates, TacticError> {
    let (lv, args) = init_args(state, stmt)?;
    let lv = require_lv(lv, stmt.span(), "create_invariant")?;
    require_arity("create_invariant", stmt.span(), args, 1)?;
    let arg = args[0].clone();
    let parent = state.clone();
    let values = state.resolve_expr(&arg)?;
    Ok(Box::new(values.map(move |r| {
        r.and_then(|value| {
            let formula = value.to_expr(arg.span).ok_or_else(|| {
                TacticError::shape(arg.span, "`create_invariant` expects a formula")
            })?;
            let mut next = parent.clone();
            next.dynamic
                .add_local(lv.clone(), Some(Value::Invariant(formula)));
            Ok(Solution::new(next))
        })
    })))
}

/// `add_invariant(i)`: append an invariant to the nearest enclosing
/// loop, recording the rewritten loop in the updated-statement map.
pub fn add(stmt: &Stmt, state: &ProofState) -> Result<Candidates, TacticError> {
    let (_, args) = init_args(state, stmt)?;
    require_arity("add_invariant", stmt.span(), args, 1)?;
    let arg = args[0].clone();
    let stmt_span = stmt.span();
    let parent = state.clone();
    let values = state.resolve_expr(&arg)?;
    Ok(Box::new(values.map(move |r| {
        r.and_then(|value| {
            let formula = match value {
                Value::Invariant(f) => f,
                Value::Expr(e) => e,
                _ => {
                    return Err(TacticError::shape(
                        arg.span,
                        "`add_invariant` expects an invariant",
                    ))
                }
            };
            let ws = enclosing_loop(&parent, stmt_span)?;
            // build on an already-rewritten loop when one exists
            let original_key = Stmt::While(ws.clone());
            let base = match parent.dynamic.updated.get(ws.span) {
                Some(Stmt::While(updated)) => updated.clone(),
                _ => ws,
            };
            let mut invariants = base.invariants.clone();
            invariants.push(formula);
            // the rewritten loop replaces the header call that produced it
            let rewritten = WhileStmt {
                invariants,
                spec_call: None,
                ..base
            };
            let mut next = parent.clone();
            next.dynamic
                .add_updated(original_key, Stmt::While(rewritten));
            Ok(Solution::new(next))
        })
    })))
}

/// `g := loop_guard()`: the guard of the nearest enclosing loop.
pub fn loop_guard(stmt: &Stmt, state: &ProofState) -> Result<Candidates, TacticError> {
    let (lv, args) = init_args(state, stmt)?;
    let lv = require_lv(lv, stmt.span(), "loop_guard")?;
    require_arity("loop_guard", stmt.span(), args, 0)?;
    let ws = enclosing_loop(state, stmt.span())?;
    let mut next = state.clone();
    next.dynamic.add_local(lv, Some(Value::Expr(ws.guard)));
    Ok(one(Solution::new(next)))
}

/// Locate the loop anchoring the tactic application: the loop whose
/// header carries the call, or the nearest loop at or above the call
/// site in the target member. Having none is a shape error regardless
/// of loops elsewhere in the member.
pub(crate) fn enclosing_loop(state: &ProofState, at: veil_ast::Span) -> Result<WhileStmt, TacticError> {
    if let Some(ws) = &state.dynamic.enclosing_loop {
        return Ok(ws.clone());
    }
    let call_span = state.statics.tac_call.span;
    if let Some(body) = &state.statics.target.body {
        if let Some(index) = body
            .stmts
            .iter()
            .position(|s| same_site(s.span(), call_span))
        {
            let found = body.stmts[..index]
                .iter()
                .rev()
                .find_map(|s| match s {
                    Stmt::While(ws) => Some(ws.clone()),
                    _ => None,
                });
            if let Some(ws) = found {
                return Ok(ws);
            }
        }
    }
    Err(TacticError::shape(
        at,
        "no enclosing loop for this operation",
    ))
}
