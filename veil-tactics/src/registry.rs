#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::rc::Rc;

use veil_ast::{Decl, Program, TacticDecl};

use crate::error::TacticError;

/// The closed set of builtin tactic operations. Dispatch is a match over
/// this enum; an unrecognized callee falls through to nested-tactic or
/// default handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AtomicOp {
    Precond,
    Postcond,
    Params,
    Returns,
    Variables,
    Lemmas,
    CreateInvariant,
    AddInvariant,
    LoopGuard,
    Explore,
    ReplaceOp,
    ReplaceConst,
    Split,
    Id,
    Fail,
}

/// Surface name -> builtin operation.
pub fn atomic_op(name: &str) -> Option<AtomicOp> {
    Some(match name {
        "preconditions" => AtomicOp::Precond,
        "postconditions" => AtomicOp::Postcond,
        "params" => AtomicOp::Params,
        "get_returns" => AtomicOp::Returns,
        "variables" => AtomicOp::Variables,
        "lemmas" => AtomicOp::Lemmas,
        "create_invariant" => AtomicOp::CreateInvariant,
        "add_invariant" => AtomicOp::AddInvariant,
        "loop_guard" => AtomicOp::LoopGuard,
        "explore" => AtomicOp::Explore,
        "replace_operator" => AtomicOp::ReplaceOp,
        "replace_constants" => AtomicOp::ReplaceConst,
        "split" => AtomicOp::Split,
        "id" => AtomicOp::Id,
        "fail" => AtomicOp::Fail,
        _ => return None,
    })
}

impl AtomicOp {
    pub fn surface_name(self) -> &'static str {
        match self {
            AtomicOp::Precond => "preconditions",
            AtomicOp::Postcond => "postconditions",
            AtomicOp::Params => "params",
            AtomicOp::Returns => "get_returns",
            AtomicOp::Variables => "variables",
            AtomicOp::Lemmas => "lemmas",
            AtomicOp::CreateInvariant => "create_invariant",
            AtomicOp::AddInvariant => "add_invariant",
            AtomicOp::LoopGuard => "loop_guard",
            AtomicOp::Explore => "explore",
            AtomicOp::ReplaceOp => "replace_operator",
            AtomicOp::ReplaceConst => "replace_constants",
            AtomicOp::Split => "split",
            AtomicOp::Id => "id",
            AtomicOp::Fail => "fail",
        }
    }
}

/// Tactic declarations scanned from the host program, keyed by name.
#[derive(Clone, Default, Debug)]
pub struct TacticRegistry {
    tactics: HashMap<String, Rc<TacticDecl>>,
}

impl TacticRegistry {
    pub fn from_program(program: &Program) -> Result<Self, TacticError> {
        let mut tactics = HashMap::new();
        for decl in &program.decls {
            if let Decl::Tactic(t) = decl {
                let name = t.name.node.clone();
                if tactics.contains_key(&name) {
                    return Err(TacticError::DuplicateTactic { name, span: t.span });
                }
                tactics.insert(name, Rc::new(t.clone()));
            }
        }
        Ok(Self { tactics })
    }

    pub fn get(&self, name: &str) -> Option<Rc<TacticDecl>> {
        self.tactics.get(name).cloned()
    }

    pub fn is_tactic(&self, name: &str) -> bool {
        self.tactics.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tactics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_ast::{ident, span, Block, Program, SearchHint};

    fn tactic(name: &str, at: usize) -> Decl {
        Decl::Tactic(TacticDecl {
            span: span(at, 1),
            name: ident(span(at, 1), name),
            params: vec![],
            search: SearchHint::Bfs,
            body: Block {
                span: span(at, 1),
                stmts: vec![],
            },
        })
    }

    #[test]
    fn duplicate_tactic_names_are_rejected() {
        let program = Program {
            decls: vec![tactic("t", 0), tactic("t", 10)],
        };
        let err = TacticRegistry::from_program(&program).expect_err("expected duplicate error");
        assert!(matches!(err, TacticError::DuplicateTactic { .. }));
    }

    #[test]
    fn every_surface_name_round_trips() {
        for op in [
            AtomicOp::Precond,
            AtomicOp::Postcond,
            AtomicOp::Params,
            AtomicOp::Returns,
            AtomicOp::Variables,
            AtomicOp::Lemmas,
            AtomicOp::CreateInvariant,
            AtomicOp::AddInvariant,
            AtomicOp::LoopGuard,
            AtomicOp::Explore,
            AtomicOp::ReplaceOp,
            AtomicOp::ReplaceConst,
            AtomicOp::Split,
            AtomicOp::Id,
            AtomicOp::Fail,
        ] {
            assert_eq!(atomic_op(op.surface_name()), Some(op));
        }
    }
}
