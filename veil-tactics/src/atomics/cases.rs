#![forbid(unsafe_code)]

use std::collections::HashMap;

use tracing::debug;

use veil_ast::{
    ident, same_site, CasesStmt, Ctor, DatatypeDecl, Expr, ExprKind, Formal, MatchArm, MatchStmt,
    Span, Stmt, Type,
};
use veil_verify::VerifyOutcome;

use crate::assemble::verify_outcome;
use crate::error::TacticError;
use crate::lazy::Odometer;
use crate::search::Candidates;
use crate::solution::Solution;
use crate::state::{one, ProofState};

/// `cases(x) { body }`: build one match arm per constructor of the
/// discriminee's datatype. With an oracle attached, arms start empty
/// and are filled one at a time, steered by which arm the first
/// verification error lands on; without one, every combination of
/// empty/resolved arm bodies is enumerated.
pub fn resolve(stmt: &Stmt, state: &ProofState) -> Result<Candidates, TacticError> {
    let Stmt::Cases(cs) = stmt else {
        return Err(TacticError::internal("cases resolver on a non-cases statement"));
    };

    let scrutinee = scrutinee_variable(cs, state)?;
    let (datatype, subst) = scrutinee_datatype(cs, state, &scrutinee)?;
    debug!(scrutinee = %scrutinee, datatype = %datatype.name.node, "resolving case split");

    if state.statics.oracle.is_some() {
        guided(cs, state, &scrutinee, &datatype, &subst)
    } else {
        enumerate(cs, state, &scrutinee, &datatype, &subst)
    }
}

/// The program variable being split on: the cases guard, resolved
/// through the tactic bindings.
fn scrutinee_variable(cs: &CasesStmt, state: &ProofState) -> Result<String, TacticError> {
    let mut guard = &cs.guard;
    while let ExprKind::Paren(inner) = &guard.kind {
        guard = inner;
    }
    let ExprKind::Name(name) = &guard.kind else {
        return Err(TacticError::shape(
            cs.guard.span,
            "`cases` expects a variable to split on",
        ));
    };
    match state.dynamic.local_value(name) {
        None => {
            if state.dynamic.has_local(name) {
                Err(TacticError::shape(
                    cs.guard.span,
                    format!("`{name}` is bound to no value"),
                ))
            } else {
                Ok(name.clone())
            }
        }
        Some(crate::value::Value::Expr(e)) => match &e.kind {
            ExprKind::Name(n) => Ok(n.clone()),
            _ => Err(TacticError::shape(
                cs.guard.span,
                format!("`{name}` does not name a program variable"),
            )),
        },
        Some(crate::value::Value::Var(f)) => Ok(f.name.node.clone()),
        Some(_) => Err(TacticError::shape(
            cs.guard.span,
            format!("`{name}` does not name a program variable"),
        )),
    }
}

/// Resolve the scrutinee's declared sum type and the instantiation of
/// its type parameters.
fn scrutinee_datatype(
    cs: &CasesStmt,
    state: &ProofState,
    scrutinee: &str,
) -> Result<(DatatypeDecl, HashMap<String, Type>), TacticError> {
    let ty = state
        .statics
        .variable_type(scrutinee)
        .ok_or_else(|| {
            TacticError::shape(
                cs.guard.span,
                format!("`{scrutinee}` is not a declared program variable"),
            )
        })?;
    let Type::Named { name, args } = ty else {
        return Err(TacticError::shape(
            cs.guard.span,
            format!("`{scrutinee}` is not of a datatype"),
        ));
    };
    let datatype = state
        .statics
        .datatype(&name)
        .cloned()
        .ok_or_else(|| {
            TacticError::shape(cs.guard.span, format!("`{name}` is not a declared datatype"))
        })?;
    let mut subst = HashMap::new();
    if datatype.type_params.len() == args.len() {
        for (param, arg) in datatype.type_params.iter().zip(args) {
            subst.insert(param.node.clone(), arg);
        }
    }
    Ok((datatype, subst))
}

fn substituted(ty: &Type, subst: &HashMap<String, Type>) -> Type {
    match ty {
        Type::Named { name, args } if args.is_empty() => subst
            .get(name)
            .cloned()
            .unwrap_or_else(|| ty.clone()),
        Type::Seq(inner) => Type::Seq(Box::new(substituted(inner, subst))),
        Type::Set(inner) => Type::Set(Box::new(substituted(inner, subst))),
        other => other.clone(),
    }
}

/// Register one constructor's formals as in-scope program variables for
/// the duration of its arm-body resolution.
fn register_ctor(state: &ProofState, ctor: &Ctor, subst: &HashMap<String, Type>) {
    state.statics.register_variables(ctor.formals.iter().map(|f| {
        Formal::new(f.span, f.name.node.clone(), substituted(&f.ty, subst))
    }));
}

fn unregister_ctor(state: &ProofState, ctor: &Ctor) {
    for f in &ctor.formals {
        state.statics.remove_variable(&f.name.node);
    }
}

/// Build the match statement for the current arm-body assignment. Arm
/// spans derive from the call site so a verification failure can be
/// attributed back to its arm.
fn build_match(
    state: &ProofState,
    scrutinee: &str,
    datatype: &DatatypeDecl,
    bodies: &[Option<Vec<Stmt>>],
) -> MatchStmt {
    let arms = datatype
        .ctors
        .iter()
        .enumerate()
        .map(|(i, ctor)| {
            let sp = state.synth_span(i + 1);
            MatchArm {
                span: sp,
                ctor: ident(sp, ctor.name.node.clone()),
                binders: ctor
                    .formals
                    .iter()
                    .map(|f| ident(sp, f.name.node.clone()))
                    .collect(),
                body: bodies[i].clone().unwrap_or_default(),
            }
        })
        .collect();
    MatchStmt {
        span: state.synth_span(0),
        scrutinee: Expr::name(state.synth_span(0), scrutinee),
        arms,
    }
}

fn match_solution(state: &ProofState, ms: MatchStmt) -> Solution {
    let mut next = state.clone();
    let stmt = Stmt::Match(ms);
    next.dynamic.add_updated(stmt.clone(), stmt);
    Solution::new(next)
}

fn arm_index(ms: &MatchStmt, error_span: Span) -> Option<usize> {
    ms.arms.iter().position(|a| same_site(a.span, error_span))
}

/// Resolved body alternatives for one constructor's arm.
fn arm_bodies(
    cs: &CasesStmt,
    state: &ProofState,
    ctor_name: &str,
) -> Result<Vec<Vec<Stmt>>, TacticError> {
    let mut scoped = state.clone();
    scoped.dynamic.active_ctor = Some(ctor_name.to_string());
    let baseline = scoped.dynamic.updated.clone();
    let mut bodies = Vec::new();
    for r in scoped.resolve_body(&cs.body)? {
        let sol = r?;
        bodies.push(sol.state.dynamic.updated.values_since(&baseline));
    }
    Ok(bodies)
}

/// Oracle-guided refinement: submit the all-empty match, then fill
/// exactly the failing arm and resubmit, at most one refinement pass
/// per constructor.
fn guided(
    cs: &CasesStmt,
    state: &ProofState,
    scrutinee: &str,
    datatype: &DatatypeDecl,
    subst: &HashMap<String, Type>,
) -> Result<Candidates, TacticError> {
    let n = datatype.ctors.len();
    let mut bodies: Vec<Option<Vec<Stmt>>> = vec![None; n];

    let ms = build_match(state, scrutinee, datatype, &bodies);
    let solution = match_solution(state, ms.clone());
    let (mut has_error, first_failing) = match verify_outcome(&solution)? {
        None => (true, None),
        Some(outcome) if outcome.is_ok() => return Ok(one(solution)),
        Some(outcome) => {
            let failing = failing_arm(&ms, &outcome);
            if failing.is_none() {
                // the error is not the match's; emit the split as-is
                return Ok(one(solution));
            }
            (true, failing)
        }
    };

    let start = first_failing.unwrap_or(0);
    for (i, ctor) in datatype.ctors.iter().enumerate().skip(start) {
        if !has_error {
            break;
        }
        register_ctor(state, ctor, subst);
        let alternatives = arm_bodies(cs, state, &ctor.name.node);
        match alternatives {
            Err(e) => {
                unregister_ctor(state, ctor);
                return Err(e);
            }
            Ok(alternatives) => {
                for body in alternatives {
                    bodies[i] = Some(body);
                    let ms = build_match(state, scrutinee, datatype, &bodies);
                    let candidate = match_solution(state, ms.clone());
                    match verify_outcome(&candidate)? {
                        None => continue,
                        Some(outcome) if outcome.is_ok() => {
                            has_error = false;
                            break;
                        }
                        Some(outcome) => match failing_arm(&ms, &outcome) {
                            // the failure moved off this arm; keep the
                            // body and let the next arm take over
                            Some(j) if j != i => break,
                            Some(_) => continue,
                            None => break,
                        },
                    }
                }
            }
        }
        unregister_ctor(state, ctor);
    }

    let ms = build_match(state, scrutinee, datatype, &bodies);
    Ok(one(match_solution(state, ms)))
}

fn failing_arm(ms: &MatchStmt, outcome: &VerifyOutcome) -> Option<usize> {
    outcome
        .first_error
        .as_ref()
        .and_then(|e| arm_index(ms, e.span))
}

/// Without an oracle: every combination of arm bodies (each arm either
/// empty or one of its resolved alternatives), in constructor order.
fn enumerate(
    cs: &CasesStmt,
    state: &ProofState,
    scrutinee: &str,
    datatype: &DatatypeDecl,
    subst: &HashMap<String, Type>,
) -> Result<Candidates, TacticError> {
    let mut per_ctor: Vec<Vec<Option<Vec<Stmt>>>> = Vec::with_capacity(datatype.ctors.len());
    for ctor in &datatype.ctors {
        register_ctor(state, ctor, subst);
        let alternatives = arm_bodies(cs, state, &ctor.name.node);
        unregister_ctor(state, ctor);
        let mut options: Vec<Option<Vec<Stmt>>> = vec![None];
        options.extend(alternatives?.into_iter().map(Some));
        per_ctor.push(options);
    }
    let dims: Vec<usize> = per_ctor.iter().map(|o| o.len()).collect();
    let parent = state.clone();
    let scrutinee = scrutinee.to_string();
    let datatype = datatype.clone();
    Ok(Box::new(Odometer::new(dims).map(move |combo| {
        let bodies: Vec<Option<Vec<Stmt>>> = combo
            .iter()
            .enumerate()
            .map(|(i, &j)| per_ctor[i][j].clone())
            .collect();
        let ms = build_match(&parent, &scrutinee, &datatype, &bodies);
        Ok(match_solution(&parent, ms))
    })))
}
