#![forbid(unsafe_code)]

use veil_ast::{Block, ElseArm, IfStmt, Stmt, WhileStmt};

use crate::error::TacticError;
use crate::exptree::ExprTree;
use crate::search::Candidates;
use crate::solution::Solution;
use crate::state::{one, ProofState};

/// Conditional composition: a fully resolvable guard selects the branch
/// to interpret; anything else emits a residual conditional whose guard
/// and branch bodies are resolved candidates.
pub fn resolve_if(stmt: &Stmt, state: &ProofState) -> Result<Candidates, TacticError> {
    let Stmt::If(ifs) = stmt else {
        return Err(TacticError::internal("if resolver on a non-conditional"));
    };
    resolve_if_inner(stmt, ifs, state)
}

fn resolve_if_inner(
    original: &Stmt,
    ifs: &IfStmt,
    state: &ProofState,
) -> Result<Candidates, TacticError> {
    let tree = ExprTree::from_expr(&ifs.guard);
    if state.fully_resolvable(&tree) {
        execute_if(original, ifs, state, &tree)
    } else {
        let residuals = residual_ifs(ifs, state)?;
        let parent = state.clone();
        let key = original.clone();
        Ok(Box::new(residuals.into_iter().map(move |residual| {
            let mut next = parent.clone();
            next.dynamic.add_updated(key.clone(), Stmt::If(residual));
            Ok(Solution::new(next))
        })))
    }
}

fn execute_if(
    original: &Stmt,
    ifs: &IfStmt,
    state: &ProofState,
    tree: &ExprTree,
) -> Result<Candidates, TacticError> {
    if state.eval_bool(tree, tree.root())? {
        return state.resolve_body(&ifs.then_block);
    }
    match ifs.else_block.as_deref() {
        None => Ok(one(Solution::new(state.clone()))),
        Some(ElseArm::Block(block)) => state.resolve_body(block),
        Some(ElseArm::If(inner)) => resolve_if_inner(original, inner, state),
    }
}

/// Every residual conditional a partially resolvable `if` can become:
/// then-candidates crossed with else-candidates.
fn residual_ifs(ifs: &IfStmt, state: &ProofState) -> Result<Vec<IfStmt>, TacticError> {
    let guard_tree = ExprTree::from_expr(&ifs.guard);
    let guard = state.resolved_guard(&guard_tree);

    let then_bodies = branch_bodies(state, &ifs.then_block)?;
    let else_arms: Vec<Option<ElseArm>> = match ifs.else_block.as_deref() {
        None => vec![None],
        Some(ElseArm::Block(block)) => branch_bodies(state, block)?
            .into_iter()
            .map(|stmts| {
                Some(ElseArm::Block(Block {
                    span: block.span,
                    stmts,
                }))
            })
            .collect(),
        Some(ElseArm::If(inner)) => residual_ifs(inner, state)?
            .into_iter()
            .map(|residual| Some(ElseArm::If(residual)))
            .collect(),
    };

    let mut out = Vec::new();
    for then_stmts in &then_bodies {
        for else_arm in &else_arms {
            out.push(IfStmt {
                span: state.synth_span(state.dynamic.counter()),
                guard: guard.clone(),
                then_block: Block {
                    span: ifs.then_block.span,
                    stmts: then_stmts.clone(),
                },
                else_block: else_arm.clone().map(Box::new),
            });
        }
    }
    Ok(out)
}

/// Loop composition. A resolvable guard interprets the loop: the body
/// resolves under the current bindings and the statement stays current
/// (partially resolved) so the search re-enters it until the guard goes
/// false. An unresolvable guard emits a residual loop around each
/// resolved body candidate.
pub fn resolve_while(stmt: &Stmt, state: &ProofState) -> Result<Candidates, TacticError> {
    let Stmt::While(ws) = stmt else {
        return Err(TacticError::internal("while resolver on a non-loop"));
    };
    let tree = ExprTree::from_expr(&ws.guard);
    if state.fully_resolvable(&tree) {
        execute_loop(ws, state, &tree)
    } else {
        insert_loop(stmt, ws, state)
    }
}

fn execute_loop(
    ws: &WhileStmt,
    state: &ProofState,
    tree: &ExprTree,
) -> Result<Candidates, TacticError> {
    let mut entry = state.clone();
    entry.dynamic.partially_resolved = false;
    if !entry.eval_bool(tree, tree.root())? {
        // the loop is done; nothing new on this branch
        return Ok(Box::new(std::iter::empty()));
    }
    let body = entry.resolve_body(&ws.body)?;
    Ok(Box::new(body.map(|r| {
        r.map(|mut sol| {
            sol.state.dynamic.partially_resolved = true;
            sol
        })
    })))
}

fn insert_loop(
    original: &Stmt,
    ws: &WhileStmt,
    state: &ProofState,
) -> Result<Candidates, TacticError> {
    let guard_tree = ExprTree::from_expr(&ws.guard);
    let guard = state.resolved_guard(&guard_tree);
    let template = ws.clone();
    let parent = state.clone();
    let key = original.clone();
    let body = state.resolve_body(&ws.body)?;
    let baseline = state.dynamic.updated.clone();
    Ok(Box::new(body.map(move |r| {
        r.map(|sol| {
            let stmts = sol.state.dynamic.updated.values_since(&baseline);
            let residual = WhileStmt {
                span: parent.synth_span(parent.dynamic.counter()),
                guard: guard.clone(),
                invariants: template.invariants.clone(),
                decreases: template.decreases.clone(),
                body: Block {
                    span: template.body.span,
                    stmts,
                },
                spec_call: None,
            };
            let mut next = parent.clone();
            next.dynamic.add_updated(key.clone(), Stmt::While(residual));
            Solution::new(next)
        })
    })))
}

/// Candidate statement lists for one branch body: the statements each
/// body resolution contributed beyond what the parent already carried.
fn branch_bodies(state: &ProofState, block: &Block) -> Result<Vec<Vec<Stmt>>, TacticError> {
    let baseline = state.dynamic.updated.clone();
    let mut bodies = Vec::new();
    for r in state.resolve_body(block)? {
        let sol = r?;
        bodies.push(sol.state.dynamic.updated.values_since(&baseline));
    }
    if bodies.is_empty() {
        bodies.push(Vec::new());
    }
    Ok(bodies)
}
