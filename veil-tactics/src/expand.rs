#![forbid(unsafe_code)]

use tracing::debug;

use veil_ast::{
    CallStmt, Decl, Formal, MethodDecl, Program, SearchHint, Stmt, Type, WhileStmt,
};
use veil_verify::SharedOracle;

use crate::assemble::{spliced_program, strip_tactic_decls};
use crate::context::{DynamicContext, StaticContext};
use crate::error::TacticError;
use crate::registry::TacticRegistry;
use crate::search;
use crate::state::ProofState;

/// Engine-wide knobs. The per-tactic search hint wins unless an
/// override is set here.
#[derive(Clone, Debug, Default)]
pub struct ExpandConfig {
    pub strategy_override: Option<SearchHint>,
}

/// Top-level driver: finds tactic call sites, resolves them one at a
/// time against the oracle, and splices accepted expansions until the
/// program carries no tactic syntax at all.
pub struct Expander {
    oracle: SharedOracle,
    config: ExpandConfig,
}

/// One discovered application site.
struct CallSite {
    member: MethodDecl,
    call: CallStmt,
    enclosing_loop: Option<WhileStmt>,
    variables: Vec<Formal>,
}

impl Expander {
    pub fn new(oracle: SharedOracle) -> Self {
        Self {
            oracle,
            config: ExpandConfig::default(),
        }
    }

    pub fn with_config(oracle: SharedOracle, config: ExpandConfig) -> Self {
        Self { oracle, config }
    }

    pub fn expand(&self, program: &Program) -> Result<Program, TacticError> {
        let mut current = program.clone();
        loop {
            let registry = TacticRegistry::from_program(&current)?;
            if registry.is_empty() {
                return Ok(strip_tactic_decls(current));
            }
            let Some(site) = find_call_site(&current, &registry) else {
                return Ok(strip_tactic_decls(current));
            };
            current = self.apply_at(&current, registry, site)?;
        }
    }

    fn apply_at(
        &self,
        program: &Program,
        registry: TacticRegistry,
        site: CallSite,
    ) -> Result<Program, TacticError> {
        let callee = site.call.call.callee.node.clone();
        let tactic = registry
            .get(&callee)
            .ok_or_else(|| TacticError::internal("call site references unknown tactic"))?;
        debug!(tactic = %callee, member = %site.member.name.node, "resolving tactic application");
        if site.call.call.args.len() != tactic.params.len() {
            return Err(TacticError::arity(
                site.call.span,
                &callee,
                tactic.params.len(),
                site.call.call.args.len(),
            ));
        }

        let statics = StaticContext::new(
            program,
            registry,
            &site.member,
            &site.call,
            Some(self.oracle.clone()),
        );
        statics.register_variables(site.variables.clone());

        let mut dynamic = DynamicContext::new(&site.member, tactic.clone(), &site.call);
        dynamic.enclosing_loop = site.enclosing_loop.clone();
        dynamic.fill_tactic_inputs();

        let state = ProofState::new(statics, dynamic);
        let strategy = self.config.strategy_override.unwrap_or(tactic.search);
        let mut results = search::run_with(state, strategy, true);
        match results.next() {
            None => Err(TacticError::Exhausted {
                tactic: callee,
                span: site.call.span,
            }),
            Some(Err(e)) => Err(e),
            Some(Ok(solution)) => {
                let accepted = solution.finalize();
                spliced_program(&accepted)
            }
        }
    }
}

/// Scan member bodies in declaration order for the first remaining
/// tactic call, collecting the program variables in scope above it.
fn find_call_site(program: &Program, registry: &TacticRegistry) -> Option<CallSite> {
    for decl in &program.decls {
        let Decl::Method(m) = decl else { continue };
        let Some(body) = &m.body else { continue };
        let mut variables: Vec<Formal> = Vec::new();
        variables.extend(m.ins.iter().cloned());
        variables.extend(m.outs.iter().cloned());
        for (index, stmt) in body.stmts.iter().enumerate() {
            match stmt {
                Stmt::VarDecl(vd) => {
                    let ty = vd.ty.clone().unwrap_or(Type::Unknown);
                    for name in &vd.names {
                        variables.push(Formal::new(name.span, name.node.clone(), ty.clone()));
                    }
                }
                Stmt::Call(cs) if registry.is_tactic(&cs.call.callee.node) => {
                    return Some(CallSite {
                        member: m.clone(),
                        call: cs.clone(),
                        enclosing_loop: nearest_loop_before(&body.stmts, index),
                        variables,
                    });
                }
                Stmt::While(ws) => {
                    if let Some(spec) = &ws.spec_call {
                        if registry.is_tactic(&spec.call.callee.node) {
                            return Some(CallSite {
                                member: m.clone(),
                                call: (**spec).clone(),
                                enclosing_loop: Some(ws.clone()),
                                variables,
                            });
                        }
                    }
                }
                _ => {}
            }
        }
    }
    None
}

/// Nearest loop statement at or above the call position, the anchor for
/// guard extraction and invariant insertion.
pub(crate) fn nearest_loop_before(stmts: &[Stmt], index: usize) -> Option<WhileStmt> {
    stmts[..=index.min(stmts.len().saturating_sub(1))]
        .iter()
        .rev()
        .find_map(|s| match s {
            Stmt::While(ws) => Some(ws.clone()),
            _ => None,
        })
}

/// Convenience entry point.
pub fn expand_program(
    program: &Program,
    oracle: SharedOracle,
    config: &ExpandConfig,
) -> Result<Program, TacticError> {
    Expander::with_config(oracle, config.clone()).expand(program)
}
