#![forbid(unsafe_code)]

use tracing::trace;

use veil_ast::{same_site, Block, CallStmt, Decl, ElseArm, Program, Stmt};
use veil_verify::VerifyOutcome;

use crate::error::TacticError;
use crate::registry::TacticRegistry;
use crate::solution::Solution;

/// Assemble the program a candidate solution denotes, ready for the
/// oracle: the call site is replaced by the solution's statements, any
/// other still-unexpanded tactic calls in the target member are dropped,
/// and tactic declarations are stripped (they are not legal output
/// syntax).
pub fn candidate_program(solution: &Solution) -> Result<Program, TacticError> {
    build(solution, true)
}

/// Splice the accepted solution into the host program, leaving other
/// tactic calls and the declarations alone so later applications can
/// still resolve. The final declaration strip happens once no calls
/// remain.
pub fn spliced_program(solution: &Solution) -> Result<Program, TacticError> {
    build(solution, false)
}

pub fn strip_tactic_decls(mut program: Program) -> Program {
    program.decls.retain(|d| !matches!(d, Decl::Tactic(_)));
    program
}

fn build(solution: &Solution, candidate: bool) -> Result<Program, TacticError> {
    let statics = &solution.state.statics;
    let dynamic = &solution.state.dynamic;
    let resolved = dynamic.all_updated();
    let tac_call = &statics.tac_call;

    let mut program = statics.program.clone();
    let member_name = dynamic.member.name.node.clone();
    let mut found = false;
    for decl in &mut program.decls {
        let Decl::Method(m) = decl else { continue };
        if m.name.node != member_name {
            continue;
        }
        if let Some(new_target) = &dynamic.new_target {
            *m = new_target.clone();
        }
        let Some(body) = &mut m.body else {
            return Err(TacticError::internal(format!(
                "target member `{member_name}` has no body"
            )));
        };
        found = splice_block(body, tac_call, &resolved);
        if candidate {
            clear_tactic_calls(body, &statics.registry);
        }
        break;
    }
    if !found {
        return Err(TacticError::internal(format!(
            "tactic call site not found in `{member_name}`"
        )));
    }
    trace!(member = %member_name, candidate, "assembled program");
    if candidate {
        Ok(strip_tactic_decls(program))
    } else {
        Ok(program)
    }
}

/// Replace the call site with the resolved statements. A call riding a
/// loop header identifies the loop statement itself, whose whole slot
/// is replaced (the rewritten loop travels inside `resolved`).
fn splice_block(block: &mut Block, tac_call: &CallStmt, resolved: &[Stmt]) -> bool {
    for i in 0..block.stmts.len() {
        let here = match &block.stmts[i] {
            Stmt::Call(cs) => same_site(cs.span, tac_call.span),
            Stmt::While(ws) => ws
                .spec_call
                .as_ref()
                .map(|spec| same_site(spec.span, tac_call.span))
                .unwrap_or(false),
            _ => false,
        };
        if here {
            block.stmts.splice(i..=i, resolved.iter().cloned());
            return true;
        }
        match &mut block.stmts[i] {
            Stmt::While(ws) => {
                if splice_block(&mut ws.body, tac_call, resolved) {
                    return true;
                }
            }
            Stmt::If(is) => {
                if splice_if(is, tac_call, resolved) {
                    return true;
                }
            }
            Stmt::Match(ms) => {
                for arm in &mut ms.arms {
                    let mut arm_block = Block {
                        span: arm.span,
                        stmts: std::mem::take(&mut arm.body),
                    };
                    let hit = splice_block(&mut arm_block, tac_call, resolved);
                    arm.body = arm_block.stmts;
                    if hit {
                        return true;
                    }
                }
            }
            _ => {}
        }
    }
    false
}

fn splice_if(stmt: &mut veil_ast::IfStmt, tac_call: &CallStmt, resolved: &[Stmt]) -> bool {
    if splice_block(&mut stmt.then_block, tac_call, resolved) {
        return true;
    }
    if let Some(els) = &mut stmt.else_block {
        match els.as_mut() {
            ElseArm::Block(b) => return splice_block(b, tac_call, resolved),
            ElseArm::If(inner) => return splice_if(inner, tac_call, resolved),
        }
    }
    false
}

/// Drop still-unexpanded tactic calls so the oracle never sees them.
fn clear_tactic_calls(block: &mut Block, registry: &TacticRegistry) {
    block.stmts.retain(|stmt| match stmt {
        Stmt::Call(cs) => !registry.is_tactic(&cs.call.callee.node),
        _ => true,
    });
    for stmt in &mut block.stmts {
        if let Stmt::While(ws) = stmt {
            if let Some(spec) = &ws.spec_call {
                if registry.is_tactic(&spec.call.callee.node) {
                    ws.spec_call = None;
                }
            }
            clear_tactic_calls(&mut ws.body, registry);
        }
    }
}

/// Submit a candidate to the oracle. `Ok(None)` means the candidate did
/// not even resolve/typecheck; both that and a verification failure are
/// rejections, never errors.
pub fn verify_outcome(solution: &Solution) -> Result<Option<VerifyOutcome>, TacticError> {
    let Some(oracle) = &solution.state.statics.oracle else {
        return Ok(Some(VerifyOutcome::ok()));
    };
    let program = candidate_program(solution)?;
    if oracle.resolve_and_typecheck(&program).is_err() {
        return Ok(None);
    }
    Ok(Some(oracle.verify(&program)))
}

pub fn verify_candidate(solution: &Solution) -> Result<bool, TacticError> {
    Ok(verify_outcome(solution)?
        .map(|o| o.is_ok())
        .unwrap_or(false))
}
