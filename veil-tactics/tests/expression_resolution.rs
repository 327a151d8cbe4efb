mod common;

use common::*;
use veil_ast::{format_expr, BinOp, Expr, ExprKind, Program, Type};
use veil_tactics::Value;

fn eval_harness() -> veil_tactics::ProofState {
    let program = Program {
        decls: vec![
            tactic_decl(10, "t", &[], vec![call_stmt(100, None, "id_placeholder", vec![])]),
            method_decl(50, "m", vec![], vec![call_stmt(60, None, "t", vec![])]),
        ],
    };
    make_state(&program, "m", None)
}

fn values_of(state: &veil_tactics::ProofState, expr: &Expr) -> Vec<Value> {
    state
        .resolve_expr(expr)
        .expect("resolver error")
        .map(|r| r.expect("value error"))
        .collect()
}

#[test]
fn fully_resolvable_arithmetic_evaluates_directly() {
    let state = eval_harness();
    // (1 + 2) * 3
    let e = Expr::binary(
        sp(0),
        Expr::paren(
            sp(0),
            Expr::binary(sp(0), int(0, 1), BinOp::Add, int(1, 2)),
        ),
        BinOp::Mul,
        int(2, 3),
    );
    let values = values_of(&state, &e);
    assert_eq!(values.len(), 1);
    assert_eq!(format_expr(values[0].as_literal().expect("literal")), "9");
}

#[test]
fn arithmetic_is_arbitrary_precision() {
    let state = eval_harness();
    let e = Expr::binary(
        sp(0),
        int(0, i64::MAX),
        BinOp::Add,
        int(1, 1),
    );
    let values = values_of(&state, &e);
    assert_eq!(
        format_expr(values[0].as_literal().expect("literal")),
        "9223372036854775808"
    );
}

#[test]
fn conjunction_short_circuits_before_division() {
    let state = eval_harness();
    // false && (1 / 0 == 1) must not evaluate the division
    let division = Expr::binary(
        sp(2),
        Expr::binary(sp(2), int(2, 1), BinOp::Div, int(3, 0)),
        BinOp::Eq,
        int(4, 1),
    );
    let e = Expr::binary(
        sp(0),
        Expr::bool_lit(sp(0), false),
        BinOp::And,
        Expr::paren(sp(1), division),
    );
    let values = values_of(&state, &e);
    assert_eq!(values[0].as_literal().and_then(|l| l.as_bool()), Some(false));
}

#[test]
fn comparison_chain_of_mixed_types_is_never_equal() {
    let state = eval_harness();
    let e = Expr::binary(sp(0), int(0, 1), BinOp::Eq, Expr::string_lit(sp(1), "1"));
    let values = values_of(&state, &e);
    assert_eq!(values[0].as_literal().and_then(|l| l.as_bool()), Some(false));
}

#[test]
fn unresolved_leaves_stay_structural() {
    let state = eval_harness();
    // y + 1 with y free resolves to itself, one candidate
    let e = Expr::binary(sp(0), nm(0, "y"), BinOp::Add, int(1, 1));
    let values = values_of(&state, &e);
    assert_eq!(values.len(), 1);
    assert_eq!(format_expr(as_expr(&values[0])), "y + 1");
}

fn as_expr(value: &Value) -> &Expr {
    match value {
        Value::Expr(e) => e,
        other => panic!("expected expression value, got {other:?}"),
    }
}

/// A display whose first element has 2 resolutions and whose second has
/// 3 yields exactly 6 candidate displays, first element outermost.
#[test]
fn display_expansion_is_cartesian_and_row_major() {
    let program = Program {
        decls: vec![
            tactic_decl(10, "t", &[], vec![call_stmt(100, None, "id_placeholder", vec![])]),
            method_decl(
                20,
                "f1",
                vec![formal(20, "p", Type::Int)],
                vec![],
            ),
            method_decl(
                30,
                "f2",
                vec![formal(30, "q", Type::Int)],
                vec![],
            ),
            method_decl(
                50,
                "m",
                vec![],
                vec![
                    host_var(51, "x", Type::Int),
                    host_var(52, "y", Type::Int),
                    host_var(53, "z", Type::Int),
                    call_stmt(60, None, "t", vec![]),
                ],
            ),
        ],
    };
    let state = make_state(&program, "m", None);

    let two = Expr {
        span: sp(0),
        kind: ExprKind::Apply(call_expr(
            0,
            "explore",
            vec![
                nm(1, "f1"),
                Expr {
                    span: sp(2),
                    kind: ExprKind::SetDisplay(vec![nm(2, "x"), nm(3, "y")]),
                },
            ],
        )),
    };
    let three = Expr {
        span: sp(4),
        kind: ExprKind::Apply(call_expr(
            4,
            "explore",
            vec![
                nm(5, "f2"),
                Expr {
                    span: sp(6),
                    kind: ExprKind::SetDisplay(vec![nm(6, "x"), nm(7, "y"), nm(8, "z")]),
                },
            ],
        )),
    };
    let display = Expr {
        span: sp(9),
        kind: ExprKind::SetDisplay(vec![two, three]),
    };

    let values = values_of(&state, &display);
    let rendered: Vec<String> = values
        .iter()
        .map(|v| format_expr(as_expr(v)))
        .collect();
    assert_eq!(
        rendered,
        vec![
            "{f1(x), f2(x)}",
            "{f1(x), f2(y)}",
            "{f1(x), f2(z)}",
            "{f1(y), f2(x)}",
            "{f1(y), f2(y)}",
            "{f1(y), f2(z)}",
        ]
    );
}

#[test]
fn replace_operator_yields_one_candidate_per_occurrence() {
    let program = Program {
        decls: vec![
            tactic_decl(
                10,
                "t",
                &["f"],
                vec![tvar_call(
                    100,
                    "r",
                    "replace_operator",
                    vec![
                        nm(101, "f"),
                        Expr {
                            span: sp(102),
                            kind: ExprKind::MapDisplay(vec![(
                                Expr::string_lit(sp(102), "+"),
                                Expr::string_lit(sp(103), "-"),
                            )]),
                        },
                    ],
                )],
            ),
            method_decl(50, "m", vec![], vec![call_stmt(
                60,
                None,
                "t",
                // a + (b + c): two `+` occurrences
                vec![Expr::binary(
                    sp(61),
                    nm(61, "a"),
                    BinOp::Add,
                    Expr::paren(
                        sp(62),
                        Expr::binary(sp(62), nm(62, "b"), BinOp::Add, nm(63, "c")),
                    ),
                )],
            )]),
        ],
    };
    let state = make_state(&program, "m", None);
    let stmt = state.dynamic.tactic.body.stmts[0].clone();
    let sols = candidates_of(&state, &stmt);
    let rendered: Vec<String> = sols
        .iter()
        .map(|s| match s.state.dynamic.local_value("r") {
            Some(Value::Expr(e)) => format_expr(e),
            other => panic!("expected bound rewrite, got {other:?}"),
        })
        .collect();
    assert_eq!(rendered, vec!["a - (b + c)", "a + (b - c)"]);
}

#[test]
fn split_separates_conjuncts_but_not_chains() {
    let chain = Expr {
        span: sp(61),
        kind: ExprKind::Chain {
            operands: vec![nm(61, "a"), nm(62, "b"), nm(63, "c")],
            ops: vec![BinOp::Lt, BinOp::Le],
        },
    };
    let formula = Expr::binary(
        sp(60),
        Expr::binary(sp(60), chain, BinOp::And, nm(64, "p")),
        BinOp::And,
        nm(65, "q"),
    );
    let program = Program {
        decls: vec![
            tactic_decl(
                10,
                "t",
                &["f"],
                vec![tvar_call(
                    100,
                    "parts",
                    "split",
                    vec![nm(101, "f"), Expr::string_lit(sp(102), "&&")],
                )],
            ),
            method_decl(50, "m", vec![], vec![call_stmt(60, None, "t", vec![formula])]),
        ],
    };
    let state = make_state(&program, "m", None);
    let stmt = state.dynamic.tactic.body.stmts[0].clone();
    let sols = candidates_of(&state, &stmt);
    assert_eq!(sols.len(), 1);
    let Some(Value::List(parts)) = sols[0].state.dynamic.local_value("parts") else {
        panic!("expected list of conjuncts");
    };
    let rendered: Vec<String> = parts
        .iter()
        .map(|v| match v {
            Value::Expr(e) => format_expr(e),
            other => panic!("expected expression, got {other:?}"),
        })
        .collect();
    assert_eq!(rendered, vec!["a < b <= c", "p", "q"]);
}
