#![forbid(unsafe_code)]

use std::rc::Rc;

use num_bigint::BigInt;
use tracing::trace;

use veil_ast::{
    span, Block, CallExpr, CallStmt, Expr, ExprKind, Formal, PredicateStmt, Span, Stmt, Type,
    UnaryOp, VarDeclStmt, VarInit,
};
use veil_ast::{ident, BinOp};

use crate::atomics;
use crate::context::{DynamicContext, StaticContext};
use crate::error::TacticError;
use crate::exptree::{singleton_eq, ExprTree, NodeId};
use crate::lazy::Odometer;
use crate::registry::atomic_op;
use crate::search::{self, Candidates};
use crate::solution::Solution;
use crate::value::Value;

pub type ValueCandidates = Box<dyn Iterator<Item = Result<Value, TacticError>>>;

/// Evaluation state of one search branch: the shared static context and
/// this branch's private dynamic context. Cloning forks the branch.
#[derive(Clone)]
pub struct ProofState {
    pub statics: Rc<StaticContext>,
    pub dynamic: DynamicContext,
}

impl ProofState {
    pub fn new(statics: Rc<StaticContext>, dynamic: DynamicContext) -> Self {
        Self { statics, dynamic }
    }

    /// Span for a synthesized node, derived from the call site so
    /// diagnostics map back to source. `k` keeps sibling nodes distinct.
    pub fn synth_span(&self, k: usize) -> Span {
        let site = self.dynamic.tac_call.span;
        span(site.offset() + k + 1, 1.max(site.len()))
    }

    // ---- statement dispatch ----

    /// Resolve one tactic-body statement into a lazy candidate stream.
    pub fn call_atomic(&self, stmt: &Stmt) -> Result<Candidates, TacticError> {
        trace!(stmt = %veil_ast::format_stmt(stmt).trim_end(), "resolving tactic statement");
        match stmt {
            Stmt::Cases(_) => atomics::cases::resolve(stmt, self),
            Stmt::If(_) => atomics::control::resolve_if(stmt, self),
            Stmt::While(_) => atomics::control::resolve_while(stmt, self),
            Stmt::Assert(p) => self.resolve_predicate(stmt, p, true),
            Stmt::Assume(p) => self.resolve_predicate(stmt, p, false),
            Stmt::VarDecl(vd) => self.resolve_var_decl(stmt, vd),
            Stmt::Call(cs) => self.resolve_call(stmt, cs),
            Stmt::Assign(_) => self.resolve_assign(stmt),
            Stmt::Match(_) => Ok(self.default_action(stmt)),
        }
    }

    fn resolve_call(&self, stmt: &Stmt, cs: &CallStmt) -> Result<Candidates, TacticError> {
        let callee = cs.call.callee.node.as_str();
        if let Some(op) = atomic_op(callee) {
            return atomics::dispatch(op, stmt, self);
        }
        if self.statics.registry.is_tactic(callee) {
            return self.resolve_nested_tactic_stmt(cs);
        }
        if self.dynamic.has_local(callee) {
            return self.resolve_argument_application(stmt, cs);
        }
        // a call to an ordinary program member is emitted as-is
        Ok(self.default_action(stmt))
    }

    /// A call whose callee is a tactic-local binding holding a member
    /// reference: substitute the member and the resolved arguments.
    fn resolve_argument_application(
        &self,
        stmt: &Stmt,
        cs: &CallStmt,
    ) -> Result<Candidates, TacticError> {
        let callee = cs.call.callee.node.as_str();
        let bound = self.dynamic.local_value(callee).cloned();
        let member = match &bound {
            Some(Value::Member(m)) => m.clone(),
            Some(Value::Expr(e)) => match &e.kind {
                ExprKind::Name(n) if self.statics.member(n).is_some() => n.clone(),
                _ => {
                    return Err(TacticError::shape(
                        stmt.span(),
                        format!("`{callee}` is not bound to a callable member"),
                    ))
                }
            },
            _ => {
                return Err(TacticError::shape(
                    stmt.span(),
                    format!("`{callee}` is not bound to a callable member"),
                ))
            }
        };
        let mut args = Vec::with_capacity(cs.call.args.len());
        for arg in &cs.call.args {
            match self.resolve_expr(arg)?.next() {
                Some(Ok(v)) => match v.to_expr(arg.span) {
                    Some(e) => args.push(e),
                    None => {
                        return Err(TacticError::shape(
                            arg.span,
                            "argument resolved to a list, expected a term",
                        ))
                    }
                },
                Some(Err(e)) => return Err(e),
                None => args.push(arg.clone()),
            }
        }
        let new_call = Stmt::Call(CallStmt {
            span: cs.span,
            lhs: cs.lhs.clone(),
            call: CallExpr {
                span: cs.call.span,
                callee: ident(cs.call.callee.span, member),
                args,
            },
        });
        let mut state = self.clone();
        state.dynamic.add_updated(stmt.clone(), new_call);
        Ok(one(Solution::new(state)))
    }

    fn resolve_var_decl(&self, stmt: &Stmt, vd: &VarDeclStmt) -> Result<Candidates, TacticError> {
        match &vd.init {
            VarInit::SuchThat(_) => atomics::such_that::resolve(stmt, self),
            VarInit::None => {
                let ty = vd.ty.clone().unwrap_or(Type::Unknown);
                let mut state = self.clone();
                for name in &vd.names {
                    state
                        .dynamic
                        .add_local(Formal::new(name.span, name.node.clone(), ty.clone()), None);
                }
                Ok(one(Solution::new(state)))
            }
            VarInit::Expr(init) => {
                if vd.names.len() != 1 {
                    return Err(TacticError::shape(
                        vd.span,
                        format!("expected 1 declared variable, got {}", vd.names.len()),
                    ));
                }
                let lv = Formal::new(
                    vd.names[0].span,
                    vd.names[0].node.clone(),
                    vd.ty.clone().unwrap_or(Type::Unknown),
                );
                if let ExprKind::Apply(call) = &init.kind {
                    if atomic_op(call.callee.node.as_str()).is_some() {
                        return atomics::dispatch(
                            atomic_op(call.callee.node.as_str()).expect("checked above"),
                            stmt,
                            self,
                        );
                    }
                    if self.statics.registry.is_tactic(call.callee.node.as_str()) {
                        return self.resolve_nested_tactic_binding(lv, call);
                    }
                }
                // anything else binds as-is; later statements resolve it
                let mut state = self.clone();
                state.dynamic.add_local(lv, Some(Value::Expr(init.clone())));
                Ok(one(Solution::new(state)))
            }
        }
    }

    fn resolve_assign(&self, stmt: &Stmt) -> Result<Candidates, TacticError> {
        let Stmt::Assign(asg) = stmt else {
            return Err(TacticError::internal("resolve_assign on non-assignment"));
        };
        if !self.dynamic.has_local(&asg.lhs.node) {
            // assignment to a program variable is host code, emitted as-is
            return Ok(self.default_action(stmt));
        }
        let key = self
            .dynamic
            .local_key(&asg.lhs.node)
            .cloned()
            .expect("binding checked above");
        if asg.rhs.is_literal() {
            let mut state = self.clone();
            state.dynamic.add_local(key, Some(Value::Expr(asg.rhs.clone())));
            return Ok(one(Solution::new(state)));
        }
        let parent = self.clone();
        let values = self.resolve_expr(&asg.rhs)?;
        Ok(Box::new(values.map(move |r| {
            r.map(|value| {
                let mut state = parent.clone();
                state.dynamic.add_local(key.clone(), Some(value));
                Solution::new(state)
            })
        })))
    }

    fn resolve_predicate(
        &self,
        stmt: &Stmt,
        p: &PredicateStmt,
        is_assert: bool,
    ) -> Result<Candidates, TacticError> {
        let parent = self.clone();
        let original = stmt.clone();
        let template = p.clone();
        let values = self.resolve_expr(&p.expr)?;
        Ok(Box::new(values.map(move |r| {
            r.and_then(|value| {
                let expr = value.to_expr(template.expr.span).ok_or_else(|| {
                    TacticError::shape(template.span, "predicate resolved to a list, expected a formula")
                })?;
                let new_pred = PredicateStmt {
                    span: template.span,
                    expr,
                };
                let new_stmt = if is_assert {
                    Stmt::Assert(new_pred)
                } else {
                    Stmt::Assume(new_pred)
                };
                let mut state = parent.clone();
                state.dynamic.add_updated(original.clone(), new_stmt);
                Ok(Solution::new(state))
            })
        })))
    }

    /// Insert the statement unchanged: the default for host-program
    /// statements a tactic body carries along.
    pub fn default_action(&self, stmt: &Stmt) -> Candidates {
        let mut state = self.clone();
        state.dynamic.add_updated(stmt.clone(), stmt.clone());
        one(Solution::new(state))
    }

    // ---- nested tactic application ----

    fn child_for_tactic(&self, cs: &CallStmt) -> Result<ProofState, TacticError> {
        let tactic = self
            .statics
            .registry
            .get(&cs.call.callee.node)
            .ok_or_else(|| TacticError::internal("nested call is not a registered tactic"))?;
        if cs.call.args.len() != tactic.params.len() {
            return Err(TacticError::arity(
                cs.span,
                &cs.call.callee.node,
                tactic.params.len(),
                cs.call.args.len(),
            ));
        }
        let mut dynamic = DynamicContext::new(&self.dynamic.member, tactic.clone(), cs);
        dynamic.enclosing_loop = self.dynamic.enclosing_loop.clone();
        dynamic.new_target = self.dynamic.new_target.clone();
        for (formal, actual) in tactic.params.iter().zip(&cs.call.args) {
            let value = match self.resolve_expr(actual)?.next() {
                Some(Ok(v)) => v,
                Some(Err(e)) => return Err(e),
                None => Value::Expr(actual.clone()),
            };
            dynamic.add_local(formal.clone(), Some(value));
        }
        Ok(ProofState::new(Rc::clone(&self.statics), dynamic))
    }

    /// Statement-position nested application: each fully resolved child
    /// solution splices its generated statements and expressions into a
    /// copy of the caller's stream. Verification stays with the caller.
    fn resolve_nested_tactic_stmt(&self, cs: &CallStmt) -> Result<Candidates, TacticError> {
        let child = self.child_for_tactic(cs)?;
        let parent = self.clone();
        Ok(Box::new(
            search::run(child, false)
                .filter(|r| r.as_ref().map(|s| s.is_resolved()).unwrap_or(true))
                .map(move |r| {
                    r.map(|child_sol| {
                        let mut state = parent.clone();
                        for (k, v) in child_sol.state.dynamic.updated.iter() {
                            state.dynamic.add_updated(k.clone(), v.clone());
                        }
                        state
                            .dynamic
                            .generated_exprs
                            .extend(child_sol.state.dynamic.generated_exprs.iter().cloned());
                        Solution::new(state)
                    })
                }),
        ))
    }

    /// `var x := tac(...)`: bind the callee's generated expression.
    fn resolve_nested_tactic_binding(
        &self,
        lv: Formal,
        call: &CallExpr,
    ) -> Result<Candidates, TacticError> {
        let cs = CallStmt {
            span: call.span,
            lhs: None,
            call: call.clone(),
        };
        let child = self.child_for_tactic(&cs)?;
        let parent = self.clone();
        Ok(Box::new(
            search::run(child, false)
                .filter(|r| r.as_ref().map(|s| s.is_resolved()).unwrap_or(true))
                .filter_map(move |r| match r {
                    Err(e) => Some(Err(e)),
                    Ok(child_sol) => {
                        let expr = child_sol.state.dynamic.generated_exprs.first().cloned()?;
                        let mut state = parent.clone();
                        state.dynamic.add_local(lv.clone(), Some(Value::Expr(expr)));
                        Some(Ok(Solution::new(state)))
                    }
                }),
        ))
    }

    // ---- block resolution ----

    /// Resolve a nested statement list with its own position counter,
    /// restoring the parent's body and counter on each result.
    pub fn resolve_body(&self, block: &Block) -> Result<Candidates, TacticError> {
        let mut child = self.clone();
        child.dynamic.body = Rc::new(block.stmts.clone());
        child.dynamic.reset_counter();
        child.dynamic.partially_resolved = false;

        let parent_body = Rc::clone(&self.dynamic.body);
        let parent_call = self.dynamic.tac_call.clone();
        let parent_counter = self.dynamic.counter();
        Ok(Box::new(search::run_block(child).map(move |r| {
            r.map(|mut sol| {
                sol.state.dynamic.body = Rc::clone(&parent_body);
                sol.state.dynamic.tac_call = parent_call.clone();
                sol.state.dynamic.set_counter(parent_counter);
                sol
            })
        })))
    }

    // ---- expression resolution (pure term rewriting, no oracle) ----

    pub fn resolve_expr(&self, expr: &Expr) -> Result<ValueCandidates, TacticError> {
        match &expr.kind {
            ExprKind::Name(n) => {
                let value = match self.dynamic.local_value(n) {
                    Some(v) => v.clone(),
                    None => Value::Expr(expr.clone()),
                };
                Ok(one_value(value))
            }
            ExprKind::Apply(call) => self.resolve_apply(expr, call),
            ExprKind::Binary { .. } | ExprKind::Paren(_) | ExprKind::Quant { .. } => {
                self.resolve_via_tree(expr)
            }
            ExprKind::Unary {
                op: UnaryOp::Neg, ..
            } => self.resolve_via_tree(expr),
            ExprKind::Unary {
                op: UnaryOp::Not,
                expr: inner,
            } => self.resolve_not(expr.span, inner),
            ExprKind::Unary {
                op: UnaryOp::Card,
                expr: inner,
            } => self.resolve_card(expr.span, inner),
            ExprKind::Path { base, member } => {
                let sp = expr.span;
                let member = member.clone();
                let original = expr.clone();
                let mut values = self.resolve_expr(base)?;
                let first = values.next();
                match first {
                    Some(Ok(v)) => {
                        let base_expr = v.to_expr(sp);
                        match base_expr {
                            Some(b) => Ok(one_value(Value::Expr(Expr {
                                span: sp,
                                kind: ExprKind::Path {
                                    base: Box::new(b),
                                    member,
                                },
                            }))),
                            None => Ok(one_value(Value::Expr(original))),
                        }
                    }
                    Some(Err(e)) => Err(e),
                    None => Ok(one_value(Value::Expr(original))),
                }
            }
            ExprKind::SetDisplay(items) => self.resolve_display(expr.span, items, false),
            ExprKind::SeqDisplay(items) => self.resolve_display(expr.span, items, true),
            _ => Ok(one_value(Value::Expr(expr.clone()))),
        }
    }

    fn resolve_apply(&self, expr: &Expr, call: &CallExpr) -> Result<ValueCandidates, TacticError> {
        let callee = call.callee.node.as_str();
        if atomic_op(callee).is_some() {
            return self.eval_atomic_value(call);
        }
        if self.statics.registry.is_tactic(callee) {
            return self.resolve_tactic_call_value(expr, call);
        }
        if self.dynamic.has_local(callee) {
            // callee itself is a binding (a member passed as argument)
            if let Some(Value::Member(m)) = self.dynamic.local_value(callee) {
                let mut rebuilt = call.clone();
                rebuilt.callee = ident(call.callee.span, m.clone());
                return Ok(one_value(Value::Expr(Expr {
                    span: expr.span,
                    kind: ExprKind::Apply(rebuilt),
                })));
            }
        }
        // a program-level call is left for the host program
        Ok(one_value(Value::Expr(expr.clone())))
    }

    /// Run a builtin in expression position by wrapping it as a
    /// one-statement declaration of a scratch local.
    fn eval_atomic_value(&self, call: &CallExpr) -> Result<ValueCandidates, TacticError> {
        let scratch = format!("__{}_result", call.callee.node);
        let vd = Stmt::VarDecl(VarDeclStmt {
            span: call.span,
            names: vec![ident(call.span, scratch.clone())],
            ty: None,
            init: VarInit::Expr(Expr {
                span: call.span,
                kind: ExprKind::Apply(call.clone()),
            }),
        });
        let solutions = self.call_atomic(&vd)?;
        Ok(Box::new(solutions.filter_map(move |r| match r {
            Err(e) => Some(Err(e)),
            Ok(sol) => sol
                .state
                .dynamic
                .local_value(&scratch)
                .cloned()
                .map(Ok),
        })))
    }

    /// Nested tactic in expression position: candidates are the
    /// callee's generated expressions; a callee that generates none
    /// falls back to the structurally rewritten application.
    fn resolve_tactic_call_value(
        &self,
        expr: &Expr,
        call: &CallExpr,
    ) -> Result<ValueCandidates, TacticError> {
        let cs = CallStmt {
            span: call.span,
            lhs: None,
            call: call.clone(),
        };
        let child = self.child_for_tactic(&cs)?;
        let fallback = expr.clone();
        let results: Vec<Result<Value, TacticError>> = search::run(child, false)
            .filter(|r| r.as_ref().map(|s| s.is_resolved()).unwrap_or(true))
            .filter_map(|r| match r {
                Err(e) => Some(Err(e)),
                Ok(sol) => sol
                    .state
                    .dynamic
                    .generated_exprs
                    .first()
                    .cloned()
                    .map(|e| Ok(Value::Expr(e))),
            })
            .collect();
        if results.is_empty() {
            return Ok(one_value(Value::Expr(fallback)));
        }
        Ok(Box::new(results.into_iter()))
    }

    fn resolve_not(&self, sp: Span, inner: &Expr) -> Result<ValueCandidates, TacticError> {
        let values = self.resolve_expr(inner)?;
        Ok(Box::new(values.map(move |r| {
            r.map(|v| match v.as_literal() {
                Some(lit) => match lit.as_bool() {
                    Some(b) => Value::Expr(Expr::bool_lit(sp, !b)),
                    None => rebuild_unary(sp, UnaryOp::Not, &v),
                },
                None => rebuild_unary(sp, UnaryOp::Not, &v),
            })
        })))
    }

    fn resolve_card(&self, sp: Span, inner: &Expr) -> Result<ValueCandidates, TacticError> {
        let values = self.resolve_expr(inner)?;
        Ok(Box::new(values.map(move |r| {
            r.map(|v| match v.elements() {
                Some(items) => Value::Expr(Expr::int(sp, BigInt::from(items.len()))),
                None => rebuild_unary(sp, UnaryOp::Card, &v),
            })
        })))
    }

    /// Elementwise Cartesian expansion of a display expression, one
    /// candidate display per combination, first element outermost.
    fn resolve_display(
        &self,
        sp: Span,
        items: &[Expr],
        is_seq: bool,
    ) -> Result<ValueCandidates, TacticError> {
        let mut per_item: Vec<Vec<Expr>> = Vec::with_capacity(items.len());
        for item in items {
            let mut choices = Vec::new();
            for r in self.resolve_expr(item)? {
                let v = r?;
                if let Some(e) = v.to_expr(item.span) {
                    choices.push(e);
                }
            }
            per_item.push(choices);
        }
        let dims: Vec<usize> = per_item.iter().map(|c| c.len()).collect();
        Ok(Box::new(Odometer::new(dims).map(move |combo| {
            let chosen: Vec<Expr> = combo
                .iter()
                .enumerate()
                .map(|(i, &j)| per_item[i][j].clone())
                .collect();
            let kind = if is_seq {
                ExprKind::SeqDisplay(chosen)
            } else {
                ExprKind::SetDisplay(chosen)
            };
            Ok(Value::Expr(Expr { span: sp, kind }))
        })))
    }

    /// Structural tree path: evaluate outright when fully resolvable,
    /// otherwise cross-product every leaf's alternatives.
    fn resolve_via_tree(&self, expr: &Expr) -> Result<ValueCandidates, TacticError> {
        let tree = ExprTree::from_expr(expr);
        if self.fully_resolvable(&tree) {
            let lit = self.eval_tree(&tree, tree.root())?;
            return Ok(one_value(Value::Expr(lit)));
        }
        self.expand_tree_candidates(tree)
    }

    fn expand_tree_candidates(&self, tree: ExprTree) -> Result<ValueCandidates, TacticError> {
        let leaves = tree.leaves();
        let mut per_leaf: Vec<(NodeId, Vec<Expr>)> = Vec::with_capacity(leaves.len());
        for id in leaves {
            let leaf_expr = tree.expr_of(id).clone();
            let mut choices = Vec::new();
            for r in self.resolve_expr(&leaf_expr)? {
                let v = r?;
                if let Some(e) = v.to_expr(leaf_expr.span) {
                    choices.push(e);
                }
            }
            per_leaf.push((id, choices));
        }
        let dims: Vec<usize> = per_leaf.iter().map(|(_, c)| c.len()).collect();
        Ok(Box::new(Odometer::new(dims).map(move |combo| {
            let mut t = tree.clone();
            for (i, (id, choices)) in per_leaf.iter().enumerate() {
                t.replace_node(*id, &choices[combo[i]]);
            }
            Ok(Value::Expr(t.to_expr()))
        })))
    }

    // ---- evaluation ----

    /// A tree is fully resolvable when every leaf reduces to a literal
    /// and no quantifier stands in the way of direct evaluation.
    pub fn fully_resolvable(&self, tree: &ExprTree) -> bool {
        for id in tree.interior() {
            if matches!(tree.expr_of(id).kind, ExprKind::Quant { .. }) {
                return false;
            }
        }
        tree.leaves().into_iter().all(|id| {
            let leaf = tree.expr_of(id);
            match &leaf.kind {
                _ if leaf.is_literal() => true,
                ExprKind::Name(n) => self
                    .dynamic
                    .local_value(n)
                    .map(|v| v.is_literal())
                    .unwrap_or(false),
                _ => false,
            }
        })
    }

    fn eval_leaf(&self, expr: &Expr) -> Result<Expr, TacticError> {
        if expr.is_literal() {
            return Ok(expr.clone());
        }
        if let ExprKind::Name(n) = &expr.kind {
            if let Some(lit) = self.dynamic.local_value(n).and_then(|v| v.as_literal()) {
                return Ok(lit.clone());
            }
        }
        Err(TacticError::internal(
            "evaluated a leaf that is not a literal; resolvability was not checked",
        ))
    }

    /// Evaluate a fully resolvable tree to a literal expression.
    pub fn eval_tree(&self, tree: &ExprTree, id: NodeId) -> Result<Expr, TacticError> {
        if tree.is_leaf(id) {
            return self.eval_leaf(tree.expr_of(id));
        }
        let node = tree.expr_of(id);
        let left = tree.node(id).left;
        let right = tree.node(id).right;
        match &node.kind {
            ExprKind::Paren(_) => self.eval_tree(tree, left.expect("paren child")),
            ExprKind::Unary { op, .. } => {
                let inner = self.eval_tree(tree, left.expect("unary child"))?;
                match (op, &inner.kind) {
                    (UnaryOp::Not, ExprKind::BoolLit(b)) => Ok(Expr::bool_lit(node.span, !b)),
                    (UnaryOp::Neg, ExprKind::IntLit(n)) => Ok(Expr::int(node.span, -n.clone())),
                    _ => Err(TacticError::shape(
                        node.span,
                        "unary operator applied to an incompatible literal",
                    )),
                }
            }
            ExprKind::Binary { op, .. } => {
                let sp = node.span;
                match op {
                    BinOp::And => {
                        let l = self.eval_bool(tree, left.expect("binary left"))?;
                        if !l {
                            return Ok(Expr::bool_lit(sp, false));
                        }
                        let r = self.eval_bool(tree, right.expect("binary right"))?;
                        Ok(Expr::bool_lit(sp, r))
                    }
                    BinOp::Or => {
                        let l = self.eval_bool(tree, left.expect("binary left"))?;
                        if l {
                            return Ok(Expr::bool_lit(sp, true));
                        }
                        let r = self.eval_bool(tree, right.expect("binary right"))?;
                        Ok(Expr::bool_lit(sp, r))
                    }
                    BinOp::Imp => {
                        let l = self.eval_bool(tree, left.expect("binary left"))?;
                        if !l {
                            return Ok(Expr::bool_lit(sp, true));
                        }
                        let r = self.eval_bool(tree, right.expect("binary right"))?;
                        Ok(Expr::bool_lit(sp, r))
                    }
                    BinOp::Iff => {
                        let l = self.eval_bool(tree, left.expect("binary left"))?;
                        let r = self.eval_bool(tree, right.expect("binary right"))?;
                        Ok(Expr::bool_lit(sp, l == r))
                    }
                    op if op.is_comparison() => {
                        let l = self.eval_tree(tree, left.expect("binary left"))?;
                        let r = self.eval_tree(tree, right.expect("binary right"))?;
                        Ok(Expr::bool_lit(sp, compare_literals(*op, &l, &r)))
                    }
                    BinOp::In | BinOp::NotIn => {
                        let l = self.eval_tree(tree, left.expect("binary left"))?;
                        let r = tree.expr_at(right.expect("binary right"));
                        let contained = match &r.kind {
                            ExprKind::SetDisplay(items) | ExprKind::SeqDisplay(items) => {
                                items.iter().any(|i| singleton_eq(i, &l))
                            }
                            _ => false,
                        };
                        let b = if *op == BinOp::In { contained } else { !contained };
                        Ok(Expr::bool_lit(sp, b))
                    }
                    BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
                        let l = self.eval_int(tree, left.expect("binary left"))?;
                        let r = self.eval_int(tree, right.expect("binary right"))?;
                        let result = match op {
                            BinOp::Add => l + r,
                            BinOp::Sub => l - r,
                            BinOp::Mul => l * r,
                            BinOp::Div => {
                                if r == BigInt::from(0) {
                                    return Err(TacticError::shape(
                                        sp,
                                        "division by zero in tactic expression",
                                    ));
                                }
                                l / r
                            }
                            BinOp::Mod => {
                                if r == BigInt::from(0) {
                                    return Err(TacticError::shape(
                                        sp,
                                        "modulo by zero in tactic expression",
                                    ));
                                }
                                l % r
                            }
                            _ => unreachable!(),
                        };
                        Ok(Expr::int(sp, result))
                    }
                    BinOp::Disjoint => Ok(Expr::bool_lit(sp, false)),
                    // All comparison ops are handled by the `is_comparison` guard
                    // above; the compiler cannot prove the guard exhaustive.
                    _ => unreachable!("comparison ops handled by is_comparison guard"),
                }
            }
            _ => Err(TacticError::internal(
                "evaluated an interior node without evaluation rules",
            )),
        }
    }

    pub fn eval_bool(&self, tree: &ExprTree, id: NodeId) -> Result<bool, TacticError> {
        Ok(self.eval_tree(tree, id)?.as_bool().unwrap_or(false))
    }

    fn eval_int(&self, tree: &ExprTree, id: NodeId) -> Result<BigInt, TacticError> {
        let lit = self.eval_tree(tree, id)?;
        match lit.kind {
            ExprKind::IntLit(n) => Ok(n),
            _ => Err(TacticError::shape(
                lit.span,
                "arithmetic on a non-integer literal",
            )),
        }
    }

    /// Rewrite name leaves of a residual guard to their bound values so
    /// the emitted construct refers to program-level names only.
    pub fn resolved_guard(&self, tree: &ExprTree) -> Expr {
        let mut out = tree.clone();
        for id in tree.leaves() {
            let leaf = tree.expr_of(id);
            if let ExprKind::Name(n) = &leaf.kind {
                if let Some(value) = self.dynamic.local_value(n) {
                    if let Some(e) = value.to_expr(leaf.span) {
                        out.replace_node(id, &e);
                    }
                }
            }
        }
        out.to_expr()
    }
}

fn rebuild_unary(sp: Span, op: UnaryOp, v: &Value) -> Value {
    match v.to_expr(sp) {
        Some(e) => Value::Expr(Expr::unary(sp, op, e)),
        None => v.clone(),
    }
}

fn compare_literals(op: BinOp, l: &Expr, r: &Expr) -> bool {
    use std::cmp::Ordering;
    let ord = match (&l.kind, &r.kind) {
        (ExprKind::IntLit(a), ExprKind::IntLit(b)) => a.cmp(b),
        (ExprKind::StringLit(a), ExprKind::StringLit(b)) => a.cmp(b),
        (ExprKind::BoolLit(a), ExprKind::BoolLit(b)) => a.cmp(b),
        // mismatched literal kinds never compare equal
        _ => return matches!(op, BinOp::Ne),
    };
    match op {
        BinOp::Eq => ord == Ordering::Equal,
        BinOp::Ne => ord != Ordering::Equal,
        BinOp::Lt => ord == Ordering::Less,
        BinOp::Gt => ord == Ordering::Greater,
        BinOp::Le => ord != Ordering::Greater,
        BinOp::Ge => ord != Ordering::Less,
        _ => false,
    }
}

pub fn one(solution: Solution) -> Candidates {
    Box::new(std::iter::once(Ok(solution)))
}

pub fn one_value(value: Value) -> ValueCandidates {
    Box::new(std::iter::once(Ok(value)))
}

/// Extract the binding target and argument list of a call-shaped tactic
/// statement. The binding target keeps its declared key when the
/// statement assigns to an existing local.
pub fn init_args<'a>(
    state: &ProofState,
    stmt: &'a Stmt,
) -> Result<(Option<Formal>, &'a [Expr]), TacticError> {
    match stmt {
        Stmt::VarDecl(vd) => {
            if vd.names.len() != 1 {
                return Err(TacticError::shape(
                    vd.span,
                    format!("expected 1 declared variable, got {}", vd.names.len()),
                ));
            }
            match &vd.init {
                VarInit::Expr(Expr {
                    kind: ExprKind::Apply(call),
                    ..
                }) => Ok((
                    Some(Formal::new(
                        vd.names[0].span,
                        vd.names[0].node.clone(),
                        Type::Unknown,
                    )),
                    &call.args,
                )),
                _ => Err(TacticError::shape(
                    vd.span,
                    "expected a builtin call initializer",
                )),
            }
        }
        Stmt::Call(cs) => match &cs.lhs {
            None => Ok((None, &cs.call.args)),
            Some(name) => {
                let key = state.dynamic.local_key(&name.node).cloned().ok_or_else(|| {
                    TacticError::shape(
                        cs.span,
                        format!("local variable `{}` is not declared", name.node),
                    )
                })?;
                Ok((Some(key), &cs.call.args))
            }
        },
        other => Err(TacticError::shape(
            other.span(),
            "expected a call-shaped tactic statement",
        )),
    }
}
