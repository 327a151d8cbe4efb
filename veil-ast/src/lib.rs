#![forbid(unsafe_code)]

mod fmt;

use miette::SourceSpan;
use num_bigint::BigInt;

pub use fmt::{format_expr, format_program, format_stmt};

pub type Span = SourceSpan;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub node: T,
}

impl<T> Spanned<T> {
    pub fn new(span: Span, node: T) -> Self {
        Self { span, node }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            span: self.span,
            node: f(self.node),
        }
    }
}

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}

pub fn span_between(start: usize, end: usize) -> Span {
    debug_assert!(end >= start);
    span(start, end - start)
}

/// Spans double as stable token positions: two statements denote the same
/// source location iff their spans are equal.
pub fn same_site(a: Span, b: Span) -> bool {
    a.offset() == b.offset() && a.len() == b.len()
}

pub type Ident = Spanned<String>;

pub fn ident(sp: Span, name: impl Into<String>) -> Ident {
    Spanned::new(sp, name.into())
}

#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub decls: Vec<Decl>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Decl {
    Datatype(DatatypeDecl),
    Method(MethodDecl),
    Tactic(TacticDecl),
}

impl Decl {
    pub fn name(&self) -> &str {
        match self {
            Decl::Datatype(d) => &d.name.node,
            Decl::Method(m) => &m.name.node,
            Decl::Tactic(t) => &t.name.node,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DatatypeDecl {
    pub span: Span,
    pub name: Ident,
    pub type_params: Vec<Ident>,
    pub ctors: Vec<Ctor>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Ctor {
    pub span: Span,
    pub name: Ident,
    pub formals: Vec<Formal>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Lemma,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MethodDecl {
    pub span: Span,
    pub kind: MethodKind,
    pub name: Ident,
    pub ins: Vec<Formal>,
    pub outs: Vec<Formal>,
    pub requires: Vec<Expr>,
    pub ensures: Vec<Expr>,
    pub decreases: Vec<Expr>,
    pub body: Option<Block>,
}

/// Search order requested by a tactic declaration attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SearchHint {
    #[default]
    Bfs,
    Dfs,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TacticDecl {
    pub span: Span,
    pub name: Ident,
    pub params: Vec<Formal>,
    pub search: SearchHint,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Formal {
    pub span: Span,
    pub name: Ident,
    pub ty: Type,
}

impl Formal {
    pub fn new(sp: Span, name: impl Into<String>, ty: Type) -> Self {
        Self {
            span: sp,
            name: ident(sp, name),
            ty,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
    Bool,
    Int,
    String,
    Seq(Box<Type>),
    Set(Box<Type>),
    Named { name: String, args: Vec<Type> },
    /// Declared without an annotation; matches anything.
    Unknown,
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::String => write!(f, "string"),
            Type::Seq(t) => write!(f, "seq<{t}>"),
            Type::Set(t) => write!(f, "set<{t}>"),
            Type::Named { name, args } => {
                write!(f, "{name}")?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{a}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            Type::Unknown => write!(f, "_"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub span: Span,
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    VarDecl(VarDeclStmt),
    Assign(AssignStmt),
    Call(CallStmt),
    If(IfStmt),
    While(WhileStmt),
    Match(MatchStmt),
    Cases(CasesStmt),
    Assert(PredicateStmt),
    Assume(PredicateStmt),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::VarDecl(s) => s.span,
            Stmt::Assign(s) => s.span,
            Stmt::Call(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::Match(s) => s.span,
            Stmt::Cases(s) => s.span,
            Stmt::Assert(s) => s.span,
            Stmt::Assume(s) => s.span,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VarDeclStmt {
    pub span: Span,
    pub names: Vec<Ident>,
    /// Declared type, shared by all names; `None` in tactic bodies.
    pub ty: Option<Type>,
    pub init: VarInit,
}

#[derive(Clone, Debug, PartialEq)]
pub enum VarInit {
    None,
    Expr(Expr),
    /// `x :| constraint`
    SuchThat(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssignStmt {
    pub span: Span,
    pub lhs: Ident,
    pub rhs: Expr,
}

/// A call in statement position, optionally binding its result:
/// `f(args)` or `x := f(args)`.
#[derive(Clone, Debug, PartialEq)]
pub struct CallStmt {
    pub span: Span,
    pub lhs: Option<Ident>,
    pub call: CallExpr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CallExpr {
    pub span: Span,
    pub callee: Ident,
    pub args: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IfStmt {
    pub span: Span,
    pub guard: Expr,
    pub then_block: Block,
    pub else_block: Option<Box<ElseArm>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ElseArm {
    Block(Block),
    If(IfStmt),
}

#[derive(Clone, Debug, PartialEq)]
pub struct WhileStmt {
    pub span: Span,
    pub guard: Expr,
    pub invariants: Vec<Expr>,
    pub decreases: Vec<Expr>,
    pub body: Block,
    /// A tactic call riding the loop header, e.g.
    /// `while g tac(); { ... }`. Attached by the parser.
    pub spec_call: Option<Box<CallStmt>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchStmt {
    pub span: Span,
    pub scrutinee: Expr,
    pub arms: Vec<MatchArm>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchArm {
    pub span: Span,
    pub ctor: Ident,
    pub binders: Vec<Ident>,
    pub body: Vec<Stmt>,
}

/// Tactic-body case-split block: `cases(x) { ... }`.
#[derive(Clone, Debug, PartialEq)]
pub struct CasesStmt {
    pub span: Span,
    pub guard: Expr,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PredicateStmt {
    pub span: Span,
    pub expr: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Name(String),
    IntLit(BigInt),
    BoolLit(bool),
    StringLit(String),
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Paren(Box<Expr>),
    Quant {
        quant: Quantifier,
        binders: Vec<QuantBinder>,
        body: Box<Expr>,
    },
    Apply(CallExpr),
    /// Qualified access, `base.member`.
    Path {
        base: Box<Expr>,
        member: Ident,
    },
    SetDisplay(Vec<Expr>),
    SeqDisplay(Vec<Expr>),
    MapDisplay(Vec<(Expr, Expr)>),
    /// `a < b <= c`: one node so rewrites treat the chain atomically.
    Chain {
        operands: Vec<Expr>,
        ops: Vec<BinOp>,
    },
}

impl Expr {
    pub fn name(sp: Span, s: impl Into<String>) -> Expr {
        Expr {
            span: sp,
            kind: ExprKind::Name(s.into()),
        }
    }

    pub fn int(sp: Span, n: impl Into<BigInt>) -> Expr {
        Expr {
            span: sp,
            kind: ExprKind::IntLit(n.into()),
        }
    }

    pub fn bool_lit(sp: Span, b: bool) -> Expr {
        Expr {
            span: sp,
            kind: ExprKind::BoolLit(b),
        }
    }

    pub fn string_lit(sp: Span, s: impl Into<String>) -> Expr {
        Expr {
            span: sp,
            kind: ExprKind::StringLit(s.into()),
        }
    }

    pub fn binary(sp: Span, left: Expr, op: BinOp, right: Expr) -> Expr {
        Expr {
            span: sp,
            kind: ExprKind::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
        }
    }

    pub fn unary(sp: Span, op: UnaryOp, expr: Expr) -> Expr {
        Expr {
            span: sp,
            kind: ExprKind::Unary {
                op,
                expr: Box::new(expr),
            },
        }
    }

    pub fn paren(sp: Span, inner: Expr) -> Expr {
        Expr {
            span: sp,
            kind: ExprKind::Paren(Box::new(inner)),
        }
    }

    pub fn apply(sp: Span, callee: Ident, args: Vec<Expr>) -> Expr {
        Expr {
            span: sp,
            kind: ExprKind::Apply(CallExpr {
                span: sp,
                callee,
                args,
            }),
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::IntLit(_) | ExprKind::BoolLit(_) | ExprKind::StringLit(_)
        )
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &self.kind {
            ExprKind::BoolLit(b) => Some(*b),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quantifier {
    Forall,
    Exists,
}

#[derive(Clone, Debug, PartialEq)]
pub struct QuantBinder {
    pub span: Span,
    pub name: Ident,
    pub ty: Option<Type>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    /// Cardinality, `|e|`.
    Card,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    And,
    Or,
    Imp,
    Iff,

    In,
    NotIn,
    Disjoint,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::Imp => "==>",
            BinOp::Iff => "<==>",
            BinOp::In => "in",
            BinOp::NotIn => "!in",
            BinOp::Disjoint => "!!",
        }
    }

    pub fn from_symbol(s: &str) -> Option<BinOp> {
        const ALL: [BinOp; 18] = [
            BinOp::Add,
            BinOp::Sub,
            BinOp::Mul,
            BinOp::Div,
            BinOp::Mod,
            BinOp::Eq,
            BinOp::Ne,
            BinOp::Lt,
            BinOp::Gt,
            BinOp::Le,
            BinOp::Ge,
            BinOp::And,
            BinOp::Or,
            BinOp::Imp,
            BinOp::Iff,
            BinOp::In,
            BinOp::NotIn,
            BinOp::Disjoint,
        ];
        ALL.into_iter().find(|op| op.symbol() == s)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge
        )
    }
}
