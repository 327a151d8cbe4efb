#![forbid(unsafe_code)]

use veil_ast::{BinOp, Expr, ExprKind, Formal, Stmt, Type, VarInit};

use crate::atomics::first_value;
use crate::error::TacticError;
use crate::search::Candidates;
use crate::solution::Solution;
use crate::state::ProofState;
use crate::value::Value;

/// `var x :| x in S && P(x)`: enumerate the resolved elements of `S`,
/// bind each to `x`, and keep the bindings under which `P` evaluates to
/// literal true. Membership and conjunction are the only supported
/// connectives.
pub fn resolve(stmt: &Stmt, state: &ProofState) -> Result<Candidates, TacticError> {
    let Stmt::VarDecl(vd) = stmt else {
        return Err(TacticError::internal("such-that resolver on a non-declaration"));
    };
    if vd.names.len() != 1 {
        return Err(TacticError::shape(
            vd.span,
            format!("expected 1 declared variable, got {}", vd.names.len()),
        ));
    }
    let VarInit::SuchThat(constraint) = &vd.init else {
        return Err(TacticError::internal("such-that resolver without a constraint"));
    };
    let lv = Formal::new(
        vd.names[0].span,
        vd.names[0].node.clone(),
        vd.ty.clone().unwrap_or(Type::Unknown),
    );

    let kept = solve_constraint(state, constraint, &lv.name.node)?;
    let parent = state.clone();
    Ok(Box::new(kept.into_iter().map(move |value| {
        let mut next = parent.clone();
        next.dynamic.add_local(lv.clone(), Some(value));
        Ok(Solution::new(next))
    })))
}

/// Candidate values for the declared variable under the constraint.
fn solve_constraint(
    state: &ProofState,
    constraint: &Expr,
    declared: &str,
) -> Result<Vec<Value>, TacticError> {
    match &constraint.kind {
        ExprKind::Paren(inner) => solve_constraint(state, inner, declared),
        ExprKind::Binary {
            left,
            op: BinOp::In,
            right,
        } => {
            let ExprKind::Name(n) = &left.kind else {
                return Err(TacticError::shape(
                    left.span,
                    "membership constraint must name the declared variable",
                ));
            };
            if n != declared {
                return Err(TacticError::shape(
                    left.span,
                    format!("expected `{declared}` before `in`, found `{n}`"),
                ));
            }
            let collection = first_value(state, right)?;
            collection.elements().ok_or_else(|| {
                TacticError::shape(right.span, "`:|` requires a resolvable collection")
            })
        }
        ExprKind::Binary {
            left,
            op: BinOp::And,
            right,
        } => {
            let domain = solve_constraint(state, left, declared)?;
            let mut kept = Vec::new();
            for item in domain {
                let mut probe = state.clone();
                probe.dynamic.add_local(
                    Formal::new(left.span, declared, Type::Unknown),
                    Some(item.clone()),
                );
                let verdict = first_value(&probe, right)?;
                let holds = match verdict.as_literal().and_then(|l| l.as_bool()) {
                    Some(b) => b,
                    None => {
                        return Err(TacticError::shape(
                            right.span,
                            "such-that predicate did not evaluate to a boolean",
                        ))
                    }
                };
                if holds {
                    kept.push(item);
                }
            }
            Ok(kept)
        }
        _ => Err(TacticError::shape(
            constraint.span,
            "unsupported such-that constraint; expected `x in S` or a conjunction",
        )),
    }
}
