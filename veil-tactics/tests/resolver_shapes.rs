mod common;

use common::*;
use veil_ast::{ExprKind, Program, Stmt};
use veil_tactics::TacticError;

/// `loop_guard` from a call site with no loop above it must be a shape
/// error, no matter how many loops exist elsewhere in the member.
#[test]
fn loop_guard_without_enclosing_loop_is_shape_error() {
    let body = vec![tvar_call(100, "g", "loop_guard", vec![])];
    let program = Program {
        decls: vec![
            tactic_decl(10, "t", &[], body),
            method_decl(
                50,
                "m",
                vec![],
                vec![
                    call_stmt(60, None, "t", vec![]),
                    // a loop *after* the call does not count
                    Stmt::While(veil_ast::WhileStmt {
                        span: sp(70),
                        guard: nm(70, "p"),
                        invariants: vec![],
                        decreases: vec![],
                        body: block(71, vec![]),
                        spec_call: None,
                    }),
                ],
            ),
        ],
    };
    let state = make_state(&program, "m", None);
    let stmt = state.dynamic.tactic.body.stmts[0].clone();
    let err = state.call_atomic(&stmt).err().expect("expected shape error");
    assert!(matches!(err, TacticError::Shape { .. }), "got {err:?}");
}

#[test]
fn add_invariant_without_enclosing_loop_is_shape_error() {
    let body = vec![
        tvar_call(100, "i", "create_invariant", vec![nm(101, "p")]),
        call_stmt(102, None, "add_invariant", vec![nm(103, "i")]),
    ];
    let program = Program {
        decls: vec![
            tactic_decl(10, "t", &[], body),
            method_decl(50, "m", vec![], vec![call_stmt(60, None, "t", vec![])]),
        ],
    };
    let state = make_state(&program, "m", None);
    let create = state.dynamic.tactic.body.stmts[0].clone();
    let after_create = candidates_of(&state, &create);
    assert_eq!(after_create.len(), 1);

    let add = state.dynamic.tactic.body.stmts[1].clone();
    let mut stream = after_create[0]
        .state
        .call_atomic(&add)
        .expect("stream should build; the error is per-candidate");
    let err = stream
        .next()
        .expect("one item")
        .err()
        .expect("expected shape error");
    assert!(matches!(err, TacticError::Shape { .. }), "got {err:?}");
}

#[test]
fn loop_guard_with_wrong_arity_is_shape_error() {
    let body = vec![tvar_call(100, "g", "loop_guard", vec![int(101, 1)])];
    let program = Program {
        decls: vec![
            tactic_decl(10, "t", &[], body),
            method_decl(50, "m", vec![], vec![call_stmt(60, None, "t", vec![])]),
        ],
    };
    let state = make_state(&program, "m", None);
    let stmt = state.dynamic.tactic.body.stmts[0].clone();
    let err = state.call_atomic(&stmt).err().expect("expected arity error");
    match err {
        TacticError::Shape { message, .. } => {
            assert!(message.contains("loop_guard"), "unexpected message: {message}")
        }
        other => panic!("expected shape error, got {other:?}"),
    }
}

#[test]
fn explore_with_wrong_arity_is_shape_error() {
    let body = vec![call_stmt(100, None, "explore", vec![nm(101, "f")])];
    let program = Program {
        decls: vec![
            tactic_decl(10, "t", &[], body),
            method_decl(50, "m", vec![], vec![call_stmt(60, None, "t", vec![])]),
        ],
    };
    let state = make_state(&program, "m", None);
    let stmt = state.dynamic.tactic.body.stmts[0].clone();
    let err = state.call_atomic(&stmt).err().expect("expected arity error");
    assert!(matches!(err, TacticError::Shape { .. }), "got {err:?}");
}

#[test]
fn binding_call_to_undeclared_local_is_shape_error() {
    // `g := loop_guard();` without a prior `var g`
    let body = vec![call_stmt(100, Some("g"), "loop_guard", vec![])];
    let program = Program {
        decls: vec![
            tactic_decl(10, "t", &[], body),
            method_decl(50, "m", vec![], vec![call_stmt(60, None, "t", vec![])]),
        ],
    };
    let state = make_state(&program, "m", None);
    let stmt = state.dynamic.tactic.body.stmts[0].clone();
    let err = state.call_atomic(&stmt).err().expect("expected shape error");
    match err {
        TacticError::Shape { message, .. } => {
            assert!(message.contains("not declared"), "unexpected message: {message}")
        }
        other => panic!("expected shape error, got {other:?}"),
    }
}

#[test]
fn loop_guard_binds_guard_of_preceding_loop() {
    let body = vec![tvar_call(100, "g", "loop_guard", vec![])];
    let program = Program {
        decls: vec![
            tactic_decl(10, "t", &[], body),
            method_decl(
                50,
                "m",
                vec![formal(50, "n", veil_ast::Type::Int)],
                vec![
                    Stmt::While(veil_ast::WhileStmt {
                        span: sp(55),
                        guard: veil_ast::Expr::binary(
                            sp(55),
                            nm(55, "i"),
                            veil_ast::BinOp::Lt,
                            nm(56, "n"),
                        ),
                        invariants: vec![],
                        decreases: vec![],
                        body: block(57, vec![]),
                        spec_call: None,
                    }),
                    call_stmt(60, None, "t", vec![]),
                ],
            ),
        ],
    };
    let state = make_state(&program, "m", None);
    let stmt = state.dynamic.tactic.body.stmts[0].clone();
    let sols = candidates_of(&state, &stmt);
    assert_eq!(sols.len(), 1);
    let bound = sols[0]
        .state
        .dynamic
        .local_value("g")
        .expect("guard bound");
    match bound {
        veil_tactics::Value::Expr(e) => {
            assert_eq!(veil_ast::format_expr(e), "i < n");
            assert!(matches!(e.kind, ExprKind::Binary { .. }));
        }
        other => panic!("expected expression binding, got {other:?}"),
    }
}
