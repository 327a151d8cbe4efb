#![forbid(unsafe_code)]

use veil_ast::{Expr, ExprKind, Formal, Span};

/// Payload of one tactic-local binding.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Expr(Expr),
    /// A program variable together with its declared type.
    Var(Formal),
    /// A program member, by name; the static context resolves it.
    Member(String),
    /// A loop invariant wrapping a formula.
    Invariant(Expr),
    List(Vec<Value>),
}

impl Value {
    /// Render the value back as an expression at the given location.
    /// Lists have no single-expression form.
    pub fn to_expr(&self, sp: Span) -> Option<Expr> {
        match self {
            Value::Expr(e) => Some(e.clone()),
            Value::Var(f) => Some(Expr::name(sp, f.name.node.clone())),
            Value::Member(name) => Some(Expr::name(sp, name.clone())),
            Value::Invariant(e) => Some(e.clone()),
            Value::List(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Expr> {
        match self {
            Value::Expr(e) if e.is_literal() => Some(e),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        self.as_literal().is_some()
    }

    /// Elements of a value usable as a collection: an explicit list, or
    /// a resolved display expression.
    pub fn elements(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(items) => Some(items.clone()),
            Value::Expr(e) => match &e.kind {
                ExprKind::SetDisplay(items) | ExprKind::SeqDisplay(items) => {
                    Some(items.iter().cloned().map(Value::Expr).collect())
                }
                _ => None,
            },
            _ => None,
        }
    }
}
