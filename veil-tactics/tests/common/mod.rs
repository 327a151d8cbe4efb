#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use veil_ast::{
    ident, span, Block, CallExpr, CallStmt, Ctor, DatatypeDecl, Decl, Expr, ExprKind, Formal,
    MethodDecl, MethodKind, PredicateStmt, Program, SearchHint, Span, Stmt, TacticDecl, Type,
    VarDeclStmt, VarInit, WhileStmt,
};
use veil_tactics::{DynamicContext, ProofState, StaticContext, TacticRegistry};
use veil_verify::{AcceptAllOracle, Oracle, ScriptedOracle, SharedOracle};

pub fn sp(at: usize) -> Span {
    span(at, 1)
}

pub fn nm(at: usize, s: &str) -> Expr {
    Expr::name(sp(at), s)
}

pub fn int(at: usize, n: i64) -> Expr {
    Expr::int(sp(at), n)
}

pub fn call_expr(at: usize, callee: &str, args: Vec<Expr>) -> CallExpr {
    CallExpr {
        span: sp(at),
        callee: ident(sp(at), callee),
        args,
    }
}

pub fn call_stmt(at: usize, lhs: Option<&str>, callee: &str, args: Vec<Expr>) -> Stmt {
    Stmt::Call(CallStmt {
        span: sp(at),
        lhs: lhs.map(|l| ident(sp(at), l)),
        call: call_expr(at, callee, args),
    })
}

/// `var name := callee(args);`
pub fn tvar_call(at: usize, name: &str, callee: &str, args: Vec<Expr>) -> Stmt {
    Stmt::VarDecl(VarDeclStmt {
        span: sp(at),
        names: vec![ident(sp(at), name)],
        ty: None,
        init: VarInit::Expr(Expr {
            span: sp(at),
            kind: ExprKind::Apply(call_expr(at, callee, args)),
        }),
    })
}

/// `var name := expr;`
pub fn tvar_expr(at: usize, name: &str, expr: Expr) -> Stmt {
    Stmt::VarDecl(VarDeclStmt {
        span: sp(at),
        names: vec![ident(sp(at), name)],
        ty: None,
        init: VarInit::Expr(expr),
    })
}

/// `var name :| constraint;`
pub fn tvar_such_that(at: usize, name: &str, constraint: Expr) -> Stmt {
    Stmt::VarDecl(VarDeclStmt {
        span: sp(at),
        names: vec![ident(sp(at), name)],
        ty: None,
        init: VarInit::SuchThat(constraint),
    })
}

/// Host declaration `var name: ty;`
pub fn host_var(at: usize, name: &str, ty: Type) -> Stmt {
    Stmt::VarDecl(VarDeclStmt {
        span: sp(at),
        names: vec![ident(sp(at), name)],
        ty: Some(ty),
        init: VarInit::None,
    })
}

pub fn assert_stmt(at: usize, expr: Expr) -> Stmt {
    Stmt::Assert(PredicateStmt { span: sp(at), expr })
}

pub fn block(at: usize, stmts: Vec<Stmt>) -> Block {
    Block {
        span: sp(at),
        stmts,
    }
}

pub fn tactic_decl(at: usize, name: &str, params: &[&str], body: Vec<Stmt>) -> Decl {
    Decl::Tactic(TacticDecl {
        span: sp(at),
        name: ident(sp(at), name),
        params: params
            .iter()
            .map(|p| Formal::new(sp(at), *p, Type::Unknown))
            .collect(),
        search: SearchHint::Bfs,
        body: block(at, body),
    })
}

pub fn method_decl(at: usize, name: &str, ins: Vec<Formal>, body: Vec<Stmt>) -> Decl {
    Decl::Method(MethodDecl {
        span: sp(at),
        kind: MethodKind::Method,
        name: ident(sp(at), name),
        ins,
        outs: vec![],
        requires: vec![],
        ensures: vec![],
        decreases: vec![],
        body: Some(block(at, body)),
    })
}

pub fn lemma_decl(at: usize, name: &str, ins: Vec<Formal>) -> Decl {
    Decl::Method(MethodDecl {
        span: sp(at),
        kind: MethodKind::Lemma,
        name: ident(sp(at), name),
        ins,
        outs: vec![],
        requires: vec![],
        ensures: vec![],
        decreases: vec![],
        body: Some(block(at, vec![])),
    })
}

pub fn formal(at: usize, name: &str, ty: Type) -> Formal {
    Formal::new(sp(at), name, ty)
}

pub fn list_datatype(at: usize) -> Decl {
    Decl::Datatype(DatatypeDecl {
        span: sp(at),
        name: ident(sp(at), "List"),
        type_params: vec![],
        ctors: vec![
            Ctor {
                span: sp(at),
                name: ident(sp(at), "Nil"),
                formals: vec![],
            },
            Ctor {
                span: sp(at + 1),
                name: ident(sp(at + 1), "Cons"),
                formals: vec![
                    formal(at + 1, "hd", Type::Int),
                    formal(
                        at + 1,
                        "tl",
                        Type::Named {
                            name: "List".into(),
                            args: vec![],
                        },
                    ),
                ],
            },
        ],
    })
}

pub fn accept_all() -> SharedOracle {
    SharedOracle::new(AcceptAllOracle)
}

pub fn scripted(oracle: ScriptedOracle) -> (SharedOracle, Arc<Mutex<ScriptedOracle>>) {
    let inner = Arc::new(Mutex::new(oracle));
    let as_dyn: Arc<Mutex<dyn Oracle + Send>> = inner.clone();
    (SharedOracle::from_arc(as_dyn), inner)
}

/// Build a resolution session for the first tactic call in `member`,
/// the way the top-level expander does.
pub fn make_state(program: &Program, member: &str, oracle: Option<SharedOracle>) -> ProofState {
    let registry = TacticRegistry::from_program(program).expect("registry");
    let md = program
        .decls
        .iter()
        .find_map(|d| match d {
            Decl::Method(m) if m.name.node == member => Some(m.clone()),
            _ => None,
        })
        .expect("member not found");
    let body = md.body.clone().expect("member body");

    let mut vars: Vec<Formal> = md.ins.clone();
    vars.extend(md.outs.clone());
    let mut call: Option<CallStmt> = None;
    let mut enclosing: Option<WhileStmt> = None;
    for (i, stmt) in body.stmts.iter().enumerate() {
        match stmt {
            Stmt::VarDecl(vd) => {
                let ty = vd.ty.clone().unwrap_or(Type::Unknown);
                for n in &vd.names {
                    vars.push(Formal::new(n.span, n.node.clone(), ty.clone()));
                }
            }
            Stmt::Call(cs) if registry.is_tactic(&cs.call.callee.node) => {
                call = Some(cs.clone());
                enclosing = body.stmts[..i].iter().rev().find_map(|s| match s {
                    Stmt::While(w) => Some(w.clone()),
                    _ => None,
                });
                break;
            }
            Stmt::While(ws) => {
                if let Some(spec) = &ws.spec_call {
                    if registry.is_tactic(&spec.call.callee.node) {
                        call = Some((**spec).clone());
                        enclosing = Some(ws.clone());
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    let call = call.expect("no tactic call in member");
    let tactic = registry.get(&call.call.callee.node).expect("tactic");
    let statics = StaticContext::new(program, registry, &md, &call, oracle);
    statics.register_variables(vars);
    let mut dynamic = DynamicContext::new(&md, tactic, &call);
    dynamic.enclosing_loop = enclosing;
    dynamic.fill_tactic_inputs();
    ProofState::new(statics, dynamic)
}

/// Collect every candidate of one statement resolution, panicking on
/// resolver errors.
pub fn candidates_of(state: &ProofState, stmt: &Stmt) -> Vec<veil_tactics::Solution> {
    state
        .call_atomic(stmt)
        .expect("resolver error")
        .map(|r| r.expect("candidate error"))
        .collect()
}
