#![forbid(unsafe_code)]

use veil_ast::{Expr, Stmt};

use crate::atomics::{require_arity, require_lv};
use crate::error::TacticError;
use crate::search::Candidates;
use crate::solution::Solution;
use crate::state::{init_args, one, ProofState};
use crate::value::Value;

/// `x := id()`: bind literal true; the no-op building block.
pub fn id(stmt: &Stmt, state: &ProofState) -> Result<Candidates, TacticError> {
    bind_literal(stmt, state, "id", true)
}

/// `x := fail()`: bind literal false, so a guard on the result kills
/// the branch.
pub fn fail(stmt: &Stmt, state: &ProofState) -> Result<Candidates, TacticError> {
    bind_literal(stmt, state, "fail", false)
}

fn bind_literal(
    stmt: &Stmt,
    state: &ProofState,
    op: &str,
    value: bool,
) -> Result<Candidates, TacticError> {
    let (lv, args) = init_args(state, stmt)?;
    let lv = require_lv(lv, stmt.span(), op)?;
    require_arity(op, stmt.span(), args, 0)?;
    let mut next = state.clone();
    let lit = Expr::bool_lit(stmt.span(), value);
    next.dynamic.add_local(lv, Some(Value::Expr(lit)));
    Ok(one(Solution::new(next)))
}
