mod common;

use common::*;
use veil_ast::{format_program, BinOp, Expr, ExprKind, Program, Type};
use veil_tactics::{expand_program, ExpandConfig, TacticError};
use veil_verify::{ScriptedOracle, VerifyOutcome};

/// method m(y: int) { t(); }
/// tactic t() { var x :| x in {1, 2, 3}; assert y >= x; }
fn three_candidate_program() -> Program {
    let membership = Expr::binary(
        sp(101),
        nm(101, "x"),
        BinOp::In,
        Expr {
            span: sp(102),
            kind: ExprKind::SetDisplay(vec![int(102, 1), int(103, 2), int(104, 3)]),
        },
    );
    Program {
        decls: vec![
            tactic_decl(
                10,
                "t",
                &[],
                vec![
                    tvar_such_that(100, "x", membership),
                    assert_stmt(
                        110,
                        Expr::binary(sp(110), nm(110, "y"), BinOp::Ge, nm(111, "x")),
                    ),
                ],
            ),
            method_decl(
                50,
                "m",
                vec![formal(50, "y", Type::Int)],
                vec![call_stmt(60, None, "t", vec![])],
            ),
        ],
    }
}

/// C1 fails, C2 passes: the expansion is C2 and C3 is never submitted.
#[test]
fn first_verified_candidate_wins_and_search_halts() {
    let program = three_candidate_program();
    let (oracle, inner) = scripted(ScriptedOracle::from_script(vec![
        VerifyOutcome::failed(sp(0), "not strong enough"),
        VerifyOutcome::ok(),
    ]));
    let expanded =
        expand_program(&program, oracle, &ExpandConfig::default()).expect("expansion");
    let text = format_program(&expanded);
    assert!(text.contains("assert y >= 2;"), "got:\n{text}");
    assert_eq!(
        inner.lock().unwrap().submission_count(),
        2,
        "the third candidate must never reach the oracle"
    );
}

#[test]
fn expansion_output_is_deterministic() {
    let program = three_candidate_program();
    let run = || {
        let (oracle, _) = scripted(ScriptedOracle::from_script(vec![
            VerifyOutcome::failed(sp(0), "no"),
            VerifyOutcome::ok(),
        ]));
        let expanded =
            expand_program(&program, oracle, &ExpandConfig::default()).expect("expansion");
        format_program(&expanded)
    };
    let first = run();
    let second = run();
    assert_eq!(first, second);
}

#[test]
fn search_exhaustion_is_reported_per_call_site() {
    let program = three_candidate_program();
    // every candidate rejected
    let (oracle, inner) = scripted(ScriptedOracle::new(|_, _| {
        VerifyOutcome::failed(sp(0), "never")
    }));
    let err = expand_program(&program, oracle, &ExpandConfig::default())
        .expect_err("expected exhaustion");
    match err {
        TacticError::Exhausted { tactic, .. } => assert_eq!(tactic, "t"),
        other => panic!("expected exhaustion, got {other:?}"),
    }
    assert_eq!(
        inner.lock().unwrap().submission_count(),
        3,
        "all three candidates should have been tried"
    );
}

/// Candidate programs the oracle sees never contain tactic syntax.
#[test]
fn oracle_submissions_carry_no_tactic_syntax() {
    let program = three_candidate_program();
    let (oracle, inner) = scripted(ScriptedOracle::from_script(vec![VerifyOutcome::ok()]));
    expand_program(&program, oracle, &ExpandConfig::default()).expect("expansion");
    let inner = inner.lock().unwrap();
    assert!(inner.submission_count() >= 1);
    for submission in inner.submissions() {
        assert!(!submission.contains("tactic "), "got:\n{submission}");
        assert!(!submission.contains("t()"), "got:\n{submission}");
    }
}

/// Depth-first order reaches the same single solution here.
#[test]
fn depth_first_strategy_finds_a_solution() {
    let program = three_candidate_program();
    let (oracle, _) = scripted(ScriptedOracle::from_script(vec![VerifyOutcome::ok()]));
    let config = ExpandConfig {
        strategy_override: Some(veil_ast::SearchHint::Dfs),
    };
    let expanded = expand_program(&program, oracle, &config).expect("expansion");
    let text = format_program(&expanded);
    assert!(text.contains("assert y >= 1;"), "got:\n{text}");
}
