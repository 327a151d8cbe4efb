#![forbid(unsafe_code)]

use veil_ast::{ExprKind, MethodDecl, MethodKind, Stmt};

use crate::atomics::{first_value, require_lv};
use crate::error::TacticError;
use crate::search::Candidates;
use crate::solution::Solution;
use crate::state::{init_args, one, ProofState};
use crate::value::Value;

/// `x := preconditions()` / `x := preconditions(m)`: the requires
/// clauses of the named (or target) member, as a list value.
pub fn preconditions(stmt: &Stmt, state: &ProofState) -> Result<Candidates, TacticError> {
    contract_lookup(stmt, state, "preconditions", |m| {
        m.requires.iter().cloned().map(Value::Expr).collect()
    })
}

/// `x := postconditions()` / `x := postconditions(m)`.
pub fn postconditions(stmt: &Stmt, state: &ProofState) -> Result<Candidates, TacticError> {
    contract_lookup(stmt, state, "postconditions", |m| {
        m.ensures.iter().cloned().map(Value::Expr).collect()
    })
}

fn contract_lookup(
    stmt: &Stmt,
    state: &ProofState,
    op: &str,
    extract: impl Fn(&MethodDecl) -> Vec<Value>,
) -> Result<Candidates, TacticError> {
    let (lv, args) = init_args(state, stmt)?;
    let lv = require_lv(lv, stmt.span(), op)?;
    if args.len() > 1 {
        return Err(TacticError::arity(stmt.span(), op, 1, args.len()));
    }
    let member = match args.first() {
        None => state.dynamic.member.clone(),
        Some(arg) => {
            let name = match first_value(state, arg)? {
                Value::Member(m) => m,
                Value::Expr(e) => match &e.kind {
                    ExprKind::Name(n) => n.clone(),
                    _ => {
                        return Err(TacticError::shape(
                            arg.span,
                            format!("`{op}` expects a member reference"),
                        ))
                    }
                },
                _ => {
                    return Err(TacticError::shape(
                        arg.span,
                        format!("`{op}` expects a member reference"),
                    ))
                }
            };
            state
                .statics
                .member(&name)
                .cloned()
                .ok_or_else(|| {
                    TacticError::shape(arg.span, format!("unknown member `{name}`"))
                })?
        }
    };
    let mut next = state.clone();
    next.dynamic.add_local(lv, Some(Value::List(extract(&member))));
    Ok(one(Solution::new(next)))
}

/// `x := params()`: the target member's in-parameters.
pub fn params(stmt: &Stmt, state: &ProofState) -> Result<Candidates, TacticError> {
    formal_lookup(stmt, state, "params", |m| m.ins.clone())
}

/// `x := get_returns()`: the target member's out-parameters.
pub fn returns(stmt: &Stmt, state: &ProofState) -> Result<Candidates, TacticError> {
    formal_lookup(stmt, state, "get_returns", |m| m.outs.clone())
}

fn formal_lookup(
    stmt: &Stmt,
    state: &ProofState,
    op: &str,
    extract: impl Fn(&MethodDecl) -> Vec<veil_ast::Formal>,
) -> Result<Candidates, TacticError> {
    let (lv, args) = init_args(state, stmt)?;
    let lv = require_lv(lv, stmt.span(), op)?;
    if !args.is_empty() {
        return Err(TacticError::arity(stmt.span(), op, 0, args.len()));
    }
    let formals = extract(&state.dynamic.member);
    let mut next = state.clone();
    next.dynamic.add_local(
        lv,
        Some(Value::List(formals.into_iter().map(Value::Var).collect())),
    );
    Ok(one(Solution::new(next)))
}

/// `x := variables()`: the program variables in scope at the call site.
pub fn variables(stmt: &Stmt, state: &ProofState) -> Result<Candidates, TacticError> {
    let (lv, args) = init_args(state, stmt)?;
    let lv = require_lv(lv, stmt.span(), "variables")?;
    if !args.is_empty() {
        return Err(TacticError::arity(stmt.span(), "variables", 0, args.len()));
    }
    let pool = state.statics.variables();
    let mut next = state.clone();
    next.dynamic.add_local(
        lv,
        Some(Value::List(pool.into_iter().map(Value::Var).collect())),
    );
    Ok(one(Solution::new(next)))
}

/// `x := lemmas()`: every lemma member of the program.
pub fn lemmas(stmt: &Stmt, state: &ProofState) -> Result<Candidates, TacticError> {
    let (lv, args) = init_args(state, stmt)?;
    let lv = require_lv(lv, stmt.span(), "lemmas")?;
    if !args.is_empty() {
        return Err(TacticError::arity(stmt.span(), "lemmas", 0, args.len()));
    }
    let mut lemmas: Vec<Value> = Vec::new();
    for decl in &state.statics.program.decls {
        if let veil_ast::Decl::Method(m) = decl {
            if m.kind == MethodKind::Lemma {
                lemmas.push(Value::Member(m.name.node.clone()));
            }
        }
    }
    let mut next = state.clone();
    next.dynamic.add_local(lv, Some(Value::List(lemmas)));
    Ok(one(Solution::new(next)))
}
