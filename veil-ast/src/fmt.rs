#![forbid(unsafe_code)]

use crate::{
    BinOp, Block, CasesStmt, Decl, ElseArm, Expr, ExprKind, IfStmt, MatchStmt, MethodKind,
    Program, Quantifier, SearchHint, Stmt, UnaryOp, VarInit, WhileStmt,
};

const INDENT: &str = "    ";

pub fn format_program(program: &Program) -> String {
    let mut out = String::new();
    let mut first = true;
    for decl in &program.decls {
        if !first {
            out.push('\n');
        }
        first = false;
        fmt_decl(&mut out, decl);
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

pub fn format_expr(expr: &Expr) -> String {
    let mut out = String::new();
    fmt_expr(&mut out, expr, Prec::Lowest);
    out
}

pub fn format_stmt(stmt: &Stmt) -> String {
    let mut out = String::new();
    fmt_stmt(&mut out, 0, stmt);
    out
}

fn fmt_decl(out: &mut String, decl: &Decl) {
    match decl {
        Decl::Datatype(d) => {
            out.push_str("datatype ");
            out.push_str(&d.name.node);
            if !d.type_params.is_empty() {
                out.push('<');
                for (i, p) in d.type_params.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&p.node);
                }
                out.push('>');
            }
            out.push_str(" = ");
            for (i, c) in d.ctors.iter().enumerate() {
                if i > 0 {
                    out.push_str(" | ");
                }
                out.push_str(&c.name.node);
                if !c.formals.is_empty() {
                    out.push('(');
                    for (j, f) in c.formals.iter().enumerate() {
                        if j > 0 {
                            out.push_str(", ");
                        }
                        out.push_str(&f.name.node);
                        out.push_str(": ");
                        out.push_str(&f.ty.to_string());
                    }
                    out.push(')');
                }
            }
            out.push('\n');
        }
        Decl::Method(m) => {
            out.push_str(match m.kind {
                MethodKind::Method => "method ",
                MethodKind::Lemma => "lemma ",
            });
            out.push_str(&m.name.node);
            out.push('(');
            for (i, f) in m.ins.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&f.name.node);
                out.push_str(": ");
                out.push_str(&f.ty.to_string());
            }
            out.push(')');
            if !m.outs.is_empty() {
                out.push_str(" returns (");
                for (i, f) in m.outs.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&f.name.node);
                    out.push_str(": ");
                    out.push_str(&f.ty.to_string());
                }
                out.push(')');
            }
            out.push('\n');
            for r in &m.requires {
                out.push_str(INDENT);
                out.push_str("requires ");
                fmt_expr(out, r, Prec::Lowest);
                out.push('\n');
            }
            for e in &m.ensures {
                out.push_str(INDENT);
                out.push_str("ensures ");
                fmt_expr(out, e, Prec::Lowest);
                out.push('\n');
            }
            for d in &m.decreases {
                out.push_str(INDENT);
                out.push_str("decreases ");
                fmt_expr(out, d, Prec::Lowest);
                out.push('\n');
            }
            if let Some(body) = &m.body {
                out.push_str("{\n");
                fmt_block(out, 1, body);
                out.push_str("}\n");
            }
        }
        Decl::Tactic(t) => {
            out.push_str("tactic ");
            out.push_str(&t.name.node);
            out.push('(');
            for (i, p) in t.params.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&p.name.node);
            }
            out.push(')');
            if t.search == SearchHint::Dfs {
                out.push_str(" {:search \"dfs\"}");
            }
            out.push_str(" {\n");
            fmt_block(out, 1, &t.body);
            out.push_str("}\n");
        }
    }
}

fn fmt_block(out: &mut String, indent: usize, block: &Block) {
    for stmt in &block.stmts {
        fmt_stmt(out, indent, stmt);
    }
}

fn fmt_stmt(out: &mut String, indent: usize, stmt: &Stmt) {
    match stmt {
        Stmt::VarDecl(s) => {
            indent_line(out, indent);
            out.push_str("var ");
            for (i, n) in s.names.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&n.node);
            }
            if let Some(ty) = &s.ty {
                out.push_str(": ");
                out.push_str(&ty.to_string());
            }
            match &s.init {
                VarInit::None => {}
                VarInit::Expr(e) => {
                    out.push_str(" := ");
                    fmt_expr(out, e, Prec::Lowest);
                }
                VarInit::SuchThat(e) => {
                    out.push_str(" :| ");
                    fmt_expr(out, e, Prec::Lowest);
                }
            }
            out.push_str(";\n");
        }
        Stmt::Assign(s) => {
            indent_line(out, indent);
            out.push_str(&s.lhs.node);
            out.push_str(" := ");
            fmt_expr(out, &s.rhs, Prec::Lowest);
            out.push_str(";\n");
        }
        Stmt::Call(s) => {
            indent_line(out, indent);
            fmt_call(out, s);
            out.push_str(";\n");
        }
        Stmt::If(s) => {
            indent_line(out, indent);
            fmt_if(out, indent, s);
        }
        Stmt::While(s) => {
            indent_line(out, indent);
            fmt_while(out, indent, s);
        }
        Stmt::Match(s) => {
            indent_line(out, indent);
            fmt_match(out, indent, s);
        }
        Stmt::Cases(s) => {
            indent_line(out, indent);
            fmt_cases(out, indent, s);
        }
        Stmt::Assert(s) => {
            indent_line(out, indent);
            out.push_str("assert ");
            fmt_expr(out, &s.expr, Prec::Lowest);
            out.push_str(";\n");
        }
        Stmt::Assume(s) => {
            indent_line(out, indent);
            out.push_str("assume ");
            fmt_expr(out, &s.expr, Prec::Lowest);
            out.push_str(";\n");
        }
    }
}

fn fmt_call(out: &mut String, s: &crate::CallStmt) {
    if let Some(lhs) = &s.lhs {
        out.push_str(&lhs.node);
        out.push_str(" := ");
    }
    out.push_str(&s.call.callee.node);
    out.push('(');
    for (i, a) in s.call.args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        fmt_expr(out, a, Prec::Lowest);
    }
    out.push(')');
}

fn fmt_if(out: &mut String, indent: usize, s: &IfStmt) {
    out.push_str("if ");
    fmt_expr(out, &s.guard, Prec::Lowest);
    out.push_str(" {\n");
    fmt_block(out, indent + 1, &s.then_block);
    indent_line(out, indent);
    out.push('}');
    if let Some(els) = &s.else_block {
        match els.as_ref() {
            ElseArm::Block(b) => {
                out.push_str(" else {\n");
                fmt_block(out, indent + 1, b);
                indent_line(out, indent);
                out.push('}');
            }
            ElseArm::If(inner) => {
                out.push_str(" else ");
                fmt_if(out, indent, inner);
                return;
            }
        }
    }
    out.push('\n');
}

fn fmt_while(out: &mut String, indent: usize, s: &WhileStmt) {
    out.push_str("while ");
    fmt_expr(out, &s.guard, Prec::Lowest);
    out.push('\n');
    for inv in &s.invariants {
        indent_line(out, indent + 1);
        out.push_str("invariant ");
        fmt_expr(out, inv, Prec::Lowest);
        out.push('\n');
    }
    for dec in &s.decreases {
        indent_line(out, indent + 1);
        out.push_str("decreases ");
        fmt_expr(out, dec, Prec::Lowest);
        out.push('\n');
    }
    if let Some(call) = &s.spec_call {
        indent_line(out, indent + 1);
        fmt_call(out, call);
        out.push_str(";\n");
    }
    indent_line(out, indent);
    out.push_str("{\n");
    fmt_block(out, indent + 1, &s.body);
    indent_line(out, indent);
    out.push_str("}\n");
}

fn fmt_match(out: &mut String, indent: usize, s: &MatchStmt) {
    out.push_str("match ");
    fmt_expr(out, &s.scrutinee, Prec::Lowest);
    out.push_str(" {\n");
    for arm in &s.arms {
        indent_line(out, indent + 1);
        out.push_str("case ");
        out.push_str(&arm.ctor.node);
        if !arm.binders.is_empty() {
            out.push('(');
            for (i, b) in arm.binders.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&b.node);
            }
            out.push(')');
        }
        out.push_str(" =>\n");
        for stmt in &arm.body {
            fmt_stmt(out, indent + 2, stmt);
        }
    }
    indent_line(out, indent);
    out.push_str("}\n");
}

fn fmt_cases(out: &mut String, indent: usize, s: &CasesStmt) {
    out.push_str("cases(");
    fmt_expr(out, &s.guard, Prec::Lowest);
    out.push_str(") {\n");
    fmt_block(out, indent + 1, &s.body);
    indent_line(out, indent);
    out.push_str("}\n");
}

fn indent_line(out: &mut String, indent: usize) {
    for _ in 0..indent {
        out.push_str(INDENT);
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    Lowest,
    Implies,
    Or,
    And,
    Cmp,
    Add,
    Mul,
    Unary,
}

fn bin_prec(op: BinOp) -> Prec {
    match op {
        BinOp::Iff | BinOp::Imp => Prec::Implies,
        BinOp::Or => Prec::Or,
        BinOp::And => Prec::And,
        BinOp::Eq
        | BinOp::Ne
        | BinOp::Lt
        | BinOp::Gt
        | BinOp::Le
        | BinOp::Ge
        | BinOp::In
        | BinOp::NotIn
        | BinOp::Disjoint => Prec::Cmp,
        BinOp::Add | BinOp::Sub => Prec::Add,
        BinOp::Mul | BinOp::Div | BinOp::Mod => Prec::Mul,
    }
}

fn fmt_expr(out: &mut String, expr: &Expr, parent: Prec) {
    match &expr.kind {
        ExprKind::Name(n) => out.push_str(n),
        ExprKind::IntLit(n) => out.push_str(&n.to_string()),
        ExprKind::BoolLit(b) => out.push_str(if *b { "true" } else { "false" }),
        ExprKind::StringLit(s) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
        ExprKind::Binary { left, op, right } => {
            let prec = bin_prec(*op);
            let need_paren = prec < parent;
            if need_paren {
                out.push('(');
            }
            fmt_expr(out, left, prec);
            out.push(' ');
            out.push_str(op.symbol());
            out.push(' ');
            fmt_expr(out, right, prec);
            if need_paren {
                out.push(')');
            }
        }
        ExprKind::Unary { op, expr: inner } => match op {
            UnaryOp::Not => {
                out.push('!');
                fmt_expr(out, inner, Prec::Unary);
            }
            UnaryOp::Neg => {
                out.push('-');
                fmt_expr(out, inner, Prec::Unary);
            }
            UnaryOp::Card => {
                out.push('|');
                fmt_expr(out, inner, Prec::Lowest);
                out.push('|');
            }
        },
        ExprKind::Paren(inner) => {
            out.push('(');
            fmt_expr(out, inner, Prec::Lowest);
            out.push(')');
        }
        ExprKind::Quant {
            quant,
            binders,
            body,
        } => {
            out.push_str(match quant {
                Quantifier::Forall => "forall ",
                Quantifier::Exists => "exists ",
            });
            for (i, b) in binders.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&b.name.node);
                if let Some(ty) = &b.ty {
                    out.push_str(": ");
                    out.push_str(&ty.to_string());
                }
            }
            out.push_str(" :: ");
            fmt_expr(out, body, Prec::Lowest);
        }
        ExprKind::Apply(call) => {
            out.push_str(&call.callee.node);
            out.push('(');
            for (i, a) in call.args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                fmt_expr(out, a, Prec::Lowest);
            }
            out.push(')');
        }
        ExprKind::Path { base, member } => {
            fmt_expr(out, base, Prec::Unary);
            out.push('.');
            out.push_str(&member.node);
        }
        ExprKind::SetDisplay(items) => {
            out.push('{');
            for (i, e) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                fmt_expr(out, e, Prec::Lowest);
            }
            out.push('}');
        }
        ExprKind::SeqDisplay(items) => {
            out.push('[');
            for (i, e) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                fmt_expr(out, e, Prec::Lowest);
            }
            out.push(']');
        }
        ExprKind::MapDisplay(pairs) => {
            out.push_str("map[");
            for (i, (k, v)) in pairs.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                fmt_expr(out, k, Prec::Lowest);
                out.push_str(" := ");
                fmt_expr(out, v, Prec::Lowest);
            }
            out.push(']');
        }
        ExprKind::Chain { operands, ops } => {
            let need_paren = Prec::Cmp < parent;
            if need_paren {
                out.push('(');
            }
            for (i, operand) in operands.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                    out.push_str(ops[i - 1].symbol());
                    out.push(' ');
                }
                fmt_expr(out, operand, Prec::Cmp);
            }
            if need_paren {
                out.push(')');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ident, span, BinOp, Expr};

    fn sp() -> crate::Span {
        span(0, 0)
    }

    #[test]
    fn binary_precedence_parenthesizes_only_when_needed() {
        let e = Expr::binary(
            sp(),
            Expr::binary(sp(), Expr::int(sp(), 1), BinOp::Add, Expr::int(sp(), 2)),
            BinOp::Mul,
            Expr::int(sp(), 3),
        );
        assert_eq!(format_expr(&e), "(1 + 2) * 3");

        let e = Expr::binary(
            sp(),
            Expr::int(sp(), 1),
            BinOp::Add,
            Expr::binary(sp(), Expr::int(sp(), 2), BinOp::Mul, Expr::int(sp(), 3)),
        );
        assert_eq!(format_expr(&e), "1 + 2 * 3");
    }

    #[test]
    fn chain_prints_all_operands() {
        let e = Expr {
            span: sp(),
            kind: crate::ExprKind::Chain {
                operands: vec![
                    Expr::name(sp(), "a"),
                    Expr::name(sp(), "b"),
                    Expr::name(sp(), "c"),
                ],
                ops: vec![BinOp::Lt, BinOp::Le],
            },
        };
        assert_eq!(format_expr(&e), "a < b <= c");
    }

    #[test]
    fn call_statement_with_binding() {
        let call = crate::CallStmt {
            span: sp(),
            lhs: Some(ident(sp(), "x")),
            call: crate::CallExpr {
                span: sp(),
                callee: ident(sp(), "preconditions"),
                args: vec![],
            },
        };
        assert_eq!(format_stmt(&Stmt::Call(call)), "x := preconditions();\n");
    }
}
