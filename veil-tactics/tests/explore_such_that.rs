mod common;

use common::*;
use veil_ast::{format_stmt, BinOp, Expr, ExprKind, Program, Type};
use veil_tactics::Value;

/// `explore(f, vars)` never yields a call whose argument's declared
/// type mismatches the formal, even when the pool holds other types.
#[test]
fn explore_filters_pool_by_declared_type() {
    let program = Program {
        decls: vec![
            tactic_decl(
                10,
                "t",
                &[],
                vec![
                    tvar_call(100, "vs", "variables", vec![]),
                    call_stmt(110, None, "explore", vec![nm(111, "f"), nm(112, "vs")]),
                ],
            ),
            method_decl(
                20,
                "f",
                vec![formal(20, "a", Type::Int), formal(21, "b", Type::Bool)],
                vec![],
            ),
            method_decl(
                50,
                "m",
                vec![],
                vec![
                    host_var(51, "x", Type::Int),
                    host_var(52, "y", Type::Bool),
                    host_var(53, "z", Type::Int),
                    call_stmt(60, None, "t", vec![]),
                ],
            ),
        ],
    };
    let state = make_state(&program, "m", None);
    let vars = state.dynamic.tactic.body.stmts[0].clone();
    let after_vars = candidates_of(&state, &vars);
    assert_eq!(after_vars.len(), 1);

    let explore = state.dynamic.tactic.body.stmts[1].clone();
    let sols = candidates_of(&after_vars[0].state, &explore);
    let rendered: Vec<String> = sols
        .iter()
        .map(|s| {
            let calls = s.state.dynamic.all_updated();
            assert_eq!(calls.len(), 1);
            format_stmt(&calls[0]).trim_end().to_string()
        })
        .collect();
    // position 0 admits the ints in pool order, position 1 only the bool
    assert_eq!(rendered, vec!["f(x, y);", "f(z, y);"]);
}

#[test]
fn explore_with_empty_position_pool_yields_nothing() {
    let program = Program {
        decls: vec![
            tactic_decl(
                10,
                "t",
                &[],
                vec![
                    tvar_call(100, "vs", "variables", vec![]),
                    call_stmt(110, None, "explore", vec![nm(111, "f"), nm(112, "vs")]),
                ],
            ),
            method_decl(20, "f", vec![formal(20, "b", Type::Bool)], vec![]),
            method_decl(
                50,
                "m",
                vec![],
                vec![host_var(51, "x", Type::Int), call_stmt(60, None, "t", vec![])],
            ),
        ],
    };
    let state = make_state(&program, "m", None);
    let vars = state.dynamic.tactic.body.stmts[0].clone();
    let after_vars = candidates_of(&state, &vars);
    let explore = state.dynamic.tactic.body.stmts[1].clone();
    let sols = candidates_of(&after_vars[0].state, &explore);
    assert!(sols.is_empty(), "no bool variable exists to fill `b`");
}

#[test]
fn such_that_keeps_only_bindings_satisfying_the_predicate() {
    let membership = Expr::binary(
        sp(101),
        nm(101, "x"),
        BinOp::In,
        Expr {
            span: sp(102),
            kind: ExprKind::SetDisplay(vec![
                int(102, 1),
                int(103, 2),
                int(104, 3),
                int(105, 4),
            ]),
        },
    );
    let predicate = Expr::binary(sp(106), nm(106, "x"), BinOp::Gt, int(107, 2));
    let constraint = Expr::binary(sp(100), membership, BinOp::And, predicate);
    let program = Program {
        decls: vec![
            tactic_decl(10, "t", &[], vec![tvar_such_that(100, "x", constraint)]),
            method_decl(50, "m", vec![], vec![call_stmt(60, None, "t", vec![])]),
        ],
    };
    let state = make_state(&program, "m", None);
    let stmt = state.dynamic.tactic.body.stmts[0].clone();
    let sols = candidates_of(&state, &stmt);
    let bound: Vec<String> = sols
        .iter()
        .map(|s| match s.state.dynamic.local_value("x") {
            Some(Value::Expr(e)) => veil_ast::format_expr(e),
            other => panic!("expected literal binding, got {other:?}"),
        })
        .collect();
    assert_eq!(bound, vec!["3", "4"]);
}

#[test]
fn such_that_over_unresolvable_collection_is_shape_error() {
    let membership = Expr::binary(sp(101), nm(101, "x"), BinOp::In, nm(102, "s"));
    let program = Program {
        decls: vec![
            tactic_decl(10, "t", &[], vec![tvar_such_that(100, "x", membership)]),
            method_decl(50, "m", vec![], vec![call_stmt(60, None, "t", vec![])]),
        ],
    };
    let state = make_state(&program, "m", None);
    let stmt = state.dynamic.tactic.body.stmts[0].clone();
    let err = state.call_atomic(&stmt).err().expect("expected shape error");
    assert!(matches!(err, veil_tactics::TacticError::Shape { .. }));
}
