#![forbid(unsafe_code)]

use veil_ast::{Expr, ExprKind, UnaryOp};

pub type NodeId = usize;

#[derive(Clone, Debug)]
pub struct Node {
    pub expr: Expr,
    pub parent: Option<NodeId>,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
}

/// Binary-tree view over one expression, stored as an index arena so a
/// branch of the search can clone and rewrite a tree without touching
/// the tree any sibling branch holds.
///
/// Binary, parenthesized, quantified and negated forms decompose into
/// children; names, literals, calls, displays, member paths and chained
/// comparisons are leaves. Interior nodes keep the original expression
/// for its operator/skeleton; reconstruction always rebuilds from the
/// children.
#[derive(Clone, Debug)]
pub struct ExprTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl ExprTree {
    pub fn from_expr(expr: &Expr) -> ExprTree {
        let mut tree = ExprTree {
            nodes: Vec::new(),
            root: 0,
        };
        let root = tree.build(expr, None);
        tree.root = root;
        tree
    }

    fn build(&mut self, expr: &Expr, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            expr: expr.clone(),
            parent,
            left: None,
            right: None,
        });
        match &expr.kind {
            ExprKind::Binary { left, right, .. } => {
                let l = self.build(left, Some(id));
                let r = self.build(right, Some(id));
                self.nodes[id].left = Some(l);
                self.nodes[id].right = Some(r);
            }
            ExprKind::Paren(inner) => {
                let l = self.build(inner, Some(id));
                self.nodes[id].left = Some(l);
            }
            ExprKind::Unary {
                op: UnaryOp::Not | UnaryOp::Neg,
                expr: inner,
            } => {
                let l = self.build(inner, Some(id));
                self.nodes[id].left = Some(l);
            }
            ExprKind::Quant { body, .. } => {
                let l = self.build(body, Some(id));
                self.nodes[id].left = Some(l);
            }
            _ => {}
        }
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn expr_of(&self, id: NodeId) -> &Expr {
        &self.nodes[id].expr
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        let n = &self.nodes[id];
        n.left.is_none() && n.right.is_none()
    }

    /// Leaf ids in left-to-right source order.
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_leaves(self.root, &mut out);
        out
    }

    fn collect_leaves(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if self.is_leaf(id) {
            out.push(id);
            return;
        }
        if let Some(l) = self.nodes[id].left {
            self.collect_leaves(l, out);
        }
        if let Some(r) = self.nodes[id].right {
            self.collect_leaves(r, out);
        }
    }

    /// Interior node ids in preorder.
    pub fn interior(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_interior(self.root, &mut out);
        out
    }

    fn collect_interior(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if self.is_leaf(id) {
            return;
        }
        out.push(id);
        if let Some(l) = self.nodes[id].left {
            self.collect_interior(l, out);
        }
        if let Some(r) = self.nodes[id].right {
            self.collect_interior(r, out);
        }
    }

    pub fn to_expr(&self) -> Expr {
        self.expr_at(self.root)
    }

    /// Rebuild the expression rooted at a node from its children.
    pub fn expr_at(&self, id: NodeId) -> Expr {
        let node = &self.nodes[id];
        if self.is_leaf(id) {
            return node.expr.clone();
        }
        match &node.expr.kind {
            ExprKind::Binary { op, .. } => {
                let left = self.expr_at(node.left.expect("binary node missing left child"));
                let right = self.expr_at(node.right.expect("binary node missing right child"));
                Expr::binary(node.expr.span, left, *op, right)
            }
            ExprKind::Paren(_) => {
                let inner = self.expr_at(node.left.expect("paren node missing child"));
                Expr::paren(node.expr.span, inner)
            }
            ExprKind::Unary { op, .. } => {
                let inner = self.expr_at(node.left.expect("unary node missing child"));
                Expr::unary(node.expr.span, *op, inner)
            }
            ExprKind::Quant { quant, binders, .. } => {
                let body = self.expr_at(node.left.expect("quantifier node missing body"));
                Expr {
                    span: node.expr.span,
                    kind: ExprKind::Quant {
                        quant: *quant,
                        binders: binders.clone(),
                        body: Box::new(body),
                    },
                }
            }
            _ => node.expr.clone(),
        }
    }

    /// Swap the stored expression of a node (used for operator rewrites
    /// on interior nodes). Children are untouched.
    pub fn set_expr(&mut self, id: NodeId, expr: Expr) {
        self.nodes[id].expr = expr;
    }

    /// Replace the subtree at `target` with `new_subtree`, in place.
    pub fn replace_node(&mut self, target: NodeId, new_subtree: &Expr) {
        let parent = self.nodes[target].parent;
        let fresh = self.build(new_subtree, parent);
        match parent {
            None => self.root = fresh,
            Some(p) => {
                if self.nodes[p].left == Some(target) {
                    self.nodes[p].left = Some(fresh);
                } else if self.nodes[p].right == Some(target) {
                    self.nodes[p].right = Some(fresh);
                }
            }
        }
        // The old subtree's nodes stay orphaned in the arena; traversal
        // never reaches them.
    }

    /// Return a new, independently rooted tree with the subtree at
    /// `target` replaced.
    pub fn find_and_replace(tree: &ExprTree, new_subtree: &Expr, target: NodeId) -> ExprTree {
        let mut copy = tree.clone();
        copy.replace_node(target, new_subtree);
        copy
    }

    /// Count leaves structurally equal to `expr`.
    pub fn occurrences_of(&self, expr: &Expr) -> usize {
        self.leaves()
            .into_iter()
            .filter(|id| singleton_eq(&self.nodes[*id].expr, expr))
            .count()
    }
}

/// Structural equality on atomic terms: names by name, literals by
/// value, member paths by base name and member.
pub fn singleton_eq(a: &Expr, b: &Expr) -> bool {
    match (&a.kind, &b.kind) {
        (ExprKind::Name(x), ExprKind::Name(y)) => x == y,
        (ExprKind::IntLit(x), ExprKind::IntLit(y)) => x == y,
        (ExprKind::BoolLit(x), ExprKind::BoolLit(y)) => x == y,
        (ExprKind::StringLit(x), ExprKind::StringLit(y)) => x == y,
        (
            ExprKind::Path { base: b1, member: m1 },
            ExprKind::Path { base: b2, member: m2 },
        ) => m1.node == m2.node && singleton_eq(b1, b2),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_ast::{span, BinOp, Expr};

    fn sp() -> veil_ast::Span {
        span(0, 0)
    }

    fn sample() -> Expr {
        // (a + 1) * b
        Expr::binary(
            sp(),
            Expr::paren(
                sp(),
                Expr::binary(sp(), Expr::name(sp(), "a"), BinOp::Add, Expr::int(sp(), 1)),
            ),
            BinOp::Mul,
            Expr::name(sp(), "b"),
        )
    }

    #[test]
    fn round_trip_is_lossless() {
        let e = sample();
        let tree = ExprTree::from_expr(&e);
        assert_eq!(tree.to_expr(), e);
    }

    #[test]
    fn leaves_are_in_source_order() {
        let tree = ExprTree::from_expr(&sample());
        let names: Vec<String> = tree
            .leaves()
            .into_iter()
            .map(|id| veil_ast::format_expr(tree.expr_of(id)))
            .collect();
        assert_eq!(names, vec!["a", "1", "b"]);
    }

    #[test]
    fn find_and_replace_leaves_original_untouched() {
        let original = ExprTree::from_expr(&sample());
        let target = original.leaves()[2]; // b
        let replaced =
            ExprTree::find_and_replace(&original, &Expr::name(sp(), "c"), target);
        assert_eq!(veil_ast::format_expr(&replaced.to_expr()), "(a + 1) * c");
        assert_eq!(veil_ast::format_expr(&original.to_expr()), "(a + 1) * b");
    }

    #[test]
    fn replacing_the_root_reroots_the_tree() {
        let tree = ExprTree::from_expr(&Expr::name(sp(), "x"));
        let replaced = ExprTree::find_and_replace(&tree, &Expr::int(sp(), 7), tree.root());
        assert_eq!(veil_ast::format_expr(&replaced.to_expr()), "7");
    }

    #[test]
    fn occurrence_counting_matches_names_and_literals() {
        // a + a + 1
        let e = Expr::binary(
            sp(),
            Expr::binary(sp(), Expr::name(sp(), "a"), BinOp::Add, Expr::name(sp(), "a")),
            BinOp::Add,
            Expr::int(sp(), 1),
        );
        let tree = ExprTree::from_expr(&e);
        assert_eq!(tree.occurrences_of(&Expr::name(sp(), "a")), 2);
        assert_eq!(tree.occurrences_of(&Expr::int(sp(), 1)), 1);
        assert_eq!(tree.occurrences_of(&Expr::name(sp(), "z")), 0);
    }

    #[test]
    fn chain_stays_atomic() {
        let chain = Expr {
            span: sp(),
            kind: veil_ast::ExprKind::Chain {
                operands: vec![Expr::name(sp(), "a"), Expr::name(sp(), "b")],
                ops: vec![BinOp::Lt],
            },
        };
        let e = Expr::binary(sp(), chain.clone(), BinOp::And, Expr::name(sp(), "p"));
        let tree = ExprTree::from_expr(&e);
        // the chain is one leaf, not torn into operands
        assert_eq!(tree.leaves().len(), 2);
        assert_eq!(tree.expr_of(tree.leaves()[0]), &chain);
    }
}
