#![forbid(unsafe_code)]

use std::collections::HashMap;

use veil_ast::{BinOp, Expr, ExprKind, Formal, Stmt, Type};

use crate::atomics::{first_value, require_arity, require_lv};
use crate::error::TacticError;
use crate::exptree::{singleton_eq, ExprTree};
use crate::search::Candidates;
use crate::solution::Solution;
use crate::state::{init_args, ProofState};
use crate::value::Value;

/// `x := replace_operator(f, map)`: rewrite occurrences of operators
/// (or variables) in a formula per the supplied mapping, yielding one
/// candidate per rewritten occurrence.
pub fn replace_operator(stmt: &Stmt, state: &ProofState) -> Result<Candidates, TacticError> {
    let (lv, args) = init_args(state, stmt)?;
    let lv = require_lv(lv, stmt.span(), "replace_operator")?;
    require_arity("replace_operator", stmt.span(), args, 2)?;

    let maps = collect_maps(state, &args[1])?;
    let formulas = collect_formulas(state, &args[0])?;

    let mut rewrites: Vec<Expr> = Vec::new();
    for formula in &formulas {
        let tree = ExprTree::from_expr(formula);
        for map in &maps {
            match classify_map(map) {
                MapKind::Operator => {
                    let op_map = operator_map(map, args[1].span)?;
                    rewrites.extend(operator_rewrites(&tree, &op_map));
                }
                MapKind::Variable => {
                    let var_map = variable_map(state, map)?;
                    rewrites.extend(variable_rewrites(&tree, &var_map));
                }
                MapKind::Unsupported => {
                    return Err(TacticError::shape(
                        args[1].span,
                        "`replace_operator` expects an operator or variable map",
                    ))
                }
            }
        }
    }
    bind_each(state, lv, rewrites)
}

/// `x := replace_constants(f, consts, vars)`: replace literal or
/// qualified-name constants with type-compatible variables, one
/// candidate per rewritten occurrence.
pub fn replace_constants(stmt: &Stmt, state: &ProofState) -> Result<Candidates, TacticError> {
    let (lv, args) = init_args(state, stmt)?;
    let lv = require_lv(lv, stmt.span(), "replace_constants")?;
    require_arity("replace_constants", stmt.span(), args, 3)?;

    let formulas = collect_formulas(state, &args[0])?;
    let constants: Vec<Expr> = first_value(state, &args[1])?
        .elements()
        .ok_or_else(|| TacticError::shape(args[1].span, "expected a list of constants"))?
        .into_iter()
        .filter_map(|v| v.to_expr(args[1].span))
        .collect();
    let vars: Vec<Formal> = first_value(state, &args[2])?
        .elements()
        .ok_or_else(|| TacticError::shape(args[2].span, "expected a list of variables"))?
        .into_iter()
        .map(|v| match v {
            Value::Var(f) => Ok(f),
            _ => Err(TacticError::shape(
                args[2].span,
                "`replace_constants` expects variables in its third argument",
            )),
        })
        .collect::<Result<_, _>>()?;

    let mut rewrites: Vec<Expr> = Vec::new();
    for formula in &formulas {
        let tree = ExprTree::from_expr(formula);
        for leaf in tree.leaves() {
            let leaf_expr = tree.expr_of(leaf);
            if !is_constant(leaf_expr) || !constants.iter().any(|c| singleton_eq(c, leaf_expr)) {
                continue;
            }
            let context_op = tree
                .node(leaf)
                .parent
                .and_then(|p| match &tree.expr_of(p).kind {
                    ExprKind::Binary { op, .. } => Some(*op),
                    _ => None,
                });
            for var in &vars {
                if !type_fits_operator(state, var, context_op) {
                    continue;
                }
                let replacement = Expr::name(leaf_expr.span, var.name.node.clone());
                let rewritten = ExprTree::find_and_replace(&tree, &replacement, leaf);
                rewrites.push(rewritten.to_expr());
            }
        }
    }
    bind_each(state, lv, rewrites)
}

/// `x := split(f, op)`: split a formula on a named operator into its
/// operand list. A chained comparison is a single atomic term and is
/// never torn across `&&`.
pub fn split(stmt: &Stmt, state: &ProofState) -> Result<Candidates, TacticError> {
    let (lv, args) = init_args(state, stmt)?;
    let lv = require_lv(lv, stmt.span(), "split")?;
    require_arity("split", stmt.span(), args, 2)?;

    let op = symbol_arg(state, &args[1])?;
    let formula = match first_value(state, &args[0])? {
        Value::Expr(e) => e,
        Value::Invariant(e) => e,
        _ => return Ok(Box::new(std::iter::empty())),
    };
    if !matches!(formula.kind, ExprKind::Binary { .. }) {
        return Ok(Box::new(std::iter::empty()));
    }
    let mut parts = Vec::new();
    split_expression(op, &formula, &mut parts);
    let mut next = state.clone();
    next.dynamic.add_local(
        lv,
        Some(Value::List(parts.into_iter().map(Value::Expr).collect())),
    );
    Ok(crate::state::one(Solution::new(next)))
}

fn split_expression(op: BinOp, expr: &Expr, out: &mut Vec<Expr>) {
    match &expr.kind {
        ExprKind::Binary {
            left,
            op: found,
            right,
        } if *found == op => {
            split_expression(op, left, out);
            split_expression(op, right, out);
        }
        _ => out.push(expr.clone()),
    }
}

// ---- shared pieces ----

enum MapKind {
    Operator,
    Variable,
    Unsupported,
}

fn classify_map(pairs: &[(Expr, Expr)]) -> MapKind {
    match pairs.first() {
        Some((a, b)) => match (&a.kind, &b.kind) {
            (ExprKind::StringLit(_), ExprKind::StringLit(_)) => MapKind::Operator,
            (ExprKind::Name(_), _) => MapKind::Variable,
            _ => MapKind::Unsupported,
        },
        None => MapKind::Unsupported,
    }
}

fn collect_formulas(state: &ProofState, arg: &Expr) -> Result<Vec<Expr>, TacticError> {
    let mut formulas = Vec::new();
    for r in state.resolve_expr(arg)? {
        let v = r?;
        match v {
            Value::Expr(e) => formulas.push(e),
            Value::Invariant(e) => formulas.push(e),
            _ => {
                return Err(TacticError::shape(
                    arg.span,
                    "expected a formula argument",
                ))
            }
        }
    }
    Ok(formulas)
}

fn collect_maps(state: &ProofState, arg: &Expr) -> Result<Vec<Vec<(Expr, Expr)>>, TacticError> {
    let mut maps = Vec::new();
    for r in state.resolve_expr(arg)? {
        match r? {
            Value::Expr(Expr {
                kind: ExprKind::MapDisplay(pairs),
                ..
            }) => maps.push(pairs),
            _ => {
                return Err(TacticError::shape(
                    arg.span,
                    "expected a map argument",
                ))
            }
        }
    }
    Ok(maps)
}

fn symbol_arg(state: &ProofState, arg: &Expr) -> Result<BinOp, TacticError> {
    let value = first_value(state, arg)?;
    let symbol = match value.as_literal() {
        Some(Expr {
            kind: ExprKind::StringLit(s),
            ..
        }) => s.clone(),
        _ => {
            return Err(TacticError::shape(
                arg.span,
                "expected an operator symbol string",
            ))
        }
    };
    BinOp::from_symbol(&symbol).ok_or_else(|| {
        TacticError::shape(
            arg.span,
            format!("`{symbol}` is not a binary operator"),
        )
    })
}

fn operator_map(
    pairs: &[(Expr, Expr)],
    at: veil_ast::Span,
) -> Result<HashMap<BinOp, BinOp>, TacticError> {
    let mut map = HashMap::new();
    for (a, b) in pairs {
        let (ExprKind::StringLit(from), ExprKind::StringLit(to)) = (&a.kind, &b.kind) else {
            return Err(TacticError::shape(at, "operator map entries must be strings"));
        };
        let from = BinOp::from_symbol(from)
            .ok_or_else(|| TacticError::shape(a.span, format!("`{from}` is not a binary operator")))?;
        let to = BinOp::from_symbol(to)
            .ok_or_else(|| TacticError::shape(b.span, format!("`{to}` is not a binary operator")))?;
        map.insert(from, to);
    }
    Ok(map)
}

/// One candidate per interior node whose operator the map rewrites.
fn operator_rewrites(tree: &ExprTree, map: &HashMap<BinOp, BinOp>) -> Vec<Expr> {
    let mut out = Vec::new();
    for id in tree.interior() {
        let node_expr = tree.expr_of(id);
        let ExprKind::Binary { left, op, right } = &node_expr.kind else {
            continue;
        };
        let Some(new_op) = map.get(op) else { continue };
        let mut rewritten = tree.clone();
        rewritten.set_expr(
            id,
            Expr {
                span: node_expr.span,
                kind: ExprKind::Binary {
                    left: left.clone(),
                    op: *new_op,
                    right: right.clone(),
                },
            },
        );
        out.push(rewritten.to_expr());
    }
    out
}

fn variable_map(
    state: &ProofState,
    pairs: &[(Expr, Expr)],
) -> Result<Vec<(Expr, Vec<Expr>)>, TacticError> {
    let mut map = Vec::new();
    for (a, b) in pairs {
        let key = first_value(state, a)?
            .to_expr(a.span)
            .ok_or_else(|| TacticError::shape(a.span, "variable map key must be a term"))?;
        let mut values = Vec::new();
        for r in state.resolve_expr(b)? {
            if let Some(e) = r?.to_expr(b.span) {
                // substituting a term for itself loops forever
                if !singleton_eq(&key, &e) {
                    values.push(e);
                }
            }
        }
        map.push((key, values));
    }
    Ok(map)
}

/// One candidate per (matching leaf, substituted value) pair.
fn variable_rewrites(tree: &ExprTree, map: &[(Expr, Vec<Expr>)]) -> Vec<Expr> {
    let mut out = Vec::new();
    for leaf in tree.leaves() {
        let leaf_expr = tree.expr_of(leaf);
        for (key, values) in map {
            if !singleton_eq(leaf_expr, key) {
                continue;
            }
            for value in values {
                let rewritten = ExprTree::find_and_replace(tree, value, leaf);
                out.push(rewritten.to_expr());
            }
        }
    }
    out
}

fn is_constant(expr: &Expr) -> bool {
    expr.is_literal() || matches!(expr.kind, ExprKind::Path { .. })
}

/// A replacement variable must make sense under the operator consuming
/// the constant: boolean connectives take booleans, comparisons and
/// arithmetic take integers, membership takes collections. Unknown
/// declared types always pass.
fn type_fits_operator(state: &ProofState, var: &Formal, op: Option<BinOp>) -> bool {
    let Some(op) = op else { return true };
    let ty = if var.ty == Type::Unknown {
        state
            .statics
            .variable_type(&var.name.node)
            .unwrap_or(Type::Unknown)
    } else {
        var.ty.clone()
    };
    if ty == Type::Unknown {
        return true;
    }
    match op {
        BinOp::And | BinOp::Or | BinOp::Imp | BinOp::Iff => ty == Type::Bool,
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            matches!(ty, Type::Int | Type::String)
        }
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => ty == Type::Int,
        BinOp::In | BinOp::NotIn | BinOp::Disjoint => {
            matches!(ty, Type::Seq(_) | Type::Set(_))
        }
    }
}

fn bind_each(
    state: &ProofState,
    lv: Formal,
    rewrites: Vec<Expr>,
) -> Result<Candidates, TacticError> {
    let parent = state.clone();
    Ok(Box::new(rewrites.into_iter().map(move |expr| {
        let mut next = parent.clone();
        next.dynamic.add_local(lv.clone(), Some(Value::Expr(expr)));
        Ok(Solution::new(next))
    })))
}
