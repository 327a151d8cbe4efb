#![forbid(unsafe_code)]

use tracing::debug;

use veil_ast::{ident, CallExpr, CallStmt, Expr, ExprKind, Formal, Stmt, Type};

use crate::atomics::{first_value, require_arity};
use crate::error::TacticError;
use crate::lazy::Odometer;
use crate::search::Candidates;
use crate::solution::Solution;
use crate::state::{init_args, ProofState};
use crate::value::Value;

/// `explore(m, vars)`: enumerate every type-compatible assignment of
/// pool variables to the callable's parameters, one call per
/// combination, in pool order.
pub fn resolve(stmt: &Stmt, state: &ProofState) -> Result<Candidates, TacticError> {
    let (lv, args) = init_args(state, stmt)?;
    require_arity("explore", stmt.span(), args, 2)?;

    let member = resolve_member(state, &args[0])?;
    let pool = resolve_pool(state, &args[1])?;

    let mut per_position: Vec<Vec<Formal>> = Vec::with_capacity(member.ins.len());
    for formal in &member.ins {
        let compatible: Vec<Formal> = pool
            .iter()
            .filter(|var| type_compatible(state, var, &formal.ty))
            .cloned()
            .collect();
        if compatible.is_empty() {
            // no typed variable can fill this slot, no call can be valid
            debug!(member = %member.name.node, param = %formal.name.node,
                "no type-compatible variables for parameter");
            return Ok(Box::new(std::iter::empty()));
        }
        per_position.push(compatible);
    }

    let dims: Vec<usize> = per_position.iter().map(|p| p.len()).collect();
    let callee = member.name.node.clone();
    let call_span = args[0].span;
    let parent = state.clone();
    let original = stmt.clone();
    Ok(Box::new(Odometer::new(dims).map(move |combo| {
        let call_args: Vec<Expr> = combo
            .iter()
            .enumerate()
            .map(|(pos, &i)| {
                let var = &per_position[pos][i];
                Expr::name(var.name.span, var.name.node.clone())
            })
            .collect();
        let call = CallExpr {
            span: call_span,
            callee: ident(call_span, callee.clone()),
            args: call_args,
        };
        let mut next = parent.clone();
        match &lv {
            Some(lv) => {
                let expr = Expr {
                    span: call_span,
                    kind: ExprKind::Apply(call),
                };
                next.dynamic.add_local(lv.clone(), Some(Value::Expr(expr)));
            }
            None => {
                let call_stmt = Stmt::Call(CallStmt {
                    span: call_span,
                    lhs: None,
                    call,
                });
                next.dynamic.add_updated(original.clone(), call_stmt);
            }
        }
        Ok(Solution::new(next))
    })))
}

fn resolve_member(
    state: &ProofState,
    arg: &Expr,
) -> Result<veil_ast::MethodDecl, TacticError> {
    let name = match first_value(state, arg)? {
        Value::Member(m) => m,
        Value::Expr(e) => match &e.kind {
            ExprKind::Name(n) => n.clone(),
            _ => {
                return Err(TacticError::shape(
                    arg.span,
                    "`explore` expects a callable member as its first argument",
                ))
            }
        },
        _ => {
            return Err(TacticError::shape(
                arg.span,
                "`explore` expects a callable member as its first argument",
            ))
        }
    };
    state
        .statics
        .member(&name)
        .cloned()
        .ok_or_else(|| TacticError::shape(arg.span, format!("unknown member `{name}`")))
}

fn resolve_pool(state: &ProofState, arg: &Expr) -> Result<Vec<Formal>, TacticError> {
    let value = first_value(state, arg)?;
    let items = value.elements().ok_or_else(|| {
        TacticError::shape(
            arg.span,
            "`explore` expects a variable list as its second argument",
        )
    })?;
    let mut pool = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Var(f) => pool.push(f),
            Value::Expr(e) => match &e.kind {
                ExprKind::Name(n) => {
                    let ty = state.statics.variable_type(n).unwrap_or(Type::Unknown);
                    pool.push(Formal::new(e.span, n.clone(), ty));
                }
                _ => {
                    return Err(TacticError::shape(
                        arg.span,
                        "`explore` pool elements must be variables",
                    ))
                }
            },
            _ => {
                return Err(TacticError::shape(
                    arg.span,
                    "`explore` pool elements must be variables",
                ))
            }
        }
    }
    Ok(pool)
}

/// Declared-type filter for one parameter slot. A variable with an
/// unknown declared type falls back to the static pool; still-unknown
/// types are kept, matching an untyped host declaration.
fn type_compatible(state: &ProofState, var: &Formal, expected: &Type) -> bool {
    let ty = if var.ty == Type::Unknown {
        state
            .statics
            .variable_type(&var.name.node)
            .unwrap_or(Type::Unknown)
    } else {
        var.ty.clone()
    };
    if ty == Type::Unknown || *expected == Type::Unknown {
        return true;
    }
    match (&ty, expected) {
        (Type::Named { name: a, .. }, Type::Named { name: b, .. }) => a == b,
        (a, b) => a == b,
    }
}
