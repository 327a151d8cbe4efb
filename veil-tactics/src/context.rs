#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use veil_ast::{
    same_site, CallStmt, DatatypeDecl, Decl, Expr, Formal, MethodDecl, Program, Span, Stmt,
    TacticDecl, Type, WhileStmt,
};
use veil_verify::SharedOracle;

use crate::registry::TacticRegistry;
use crate::value::Value;

#[derive(Clone, Debug, Default)]
pub struct SearchStats {
    pub total_branches: u64,
    pub discarded_branches: u64,
}

/// Program-wide state of one resolution session, shared by reference
/// across every branch. Only the finalization fields and the variable
/// pool sit behind `RefCell`; everything else is read-only after
/// construction.
pub struct StaticContext {
    pub program: Program,
    pub datatypes: HashMap<String, DatatypeDecl>,
    pub members: HashMap<String, MethodDecl>,
    pub registry: TacticRegistry,
    /// The member owning the top-level tactic call.
    pub target: MethodDecl,
    /// The top-level call site.
    pub tac_call: CallStmt,
    pub oracle: Option<SharedOracle>,
    variables: RefCell<Vec<Formal>>,
    /// Statements accepted as the final answer; written at finalization.
    pub resolved: RefCell<Vec<Stmt>>,
    pub new_target: RefCell<Option<MethodDecl>>,
    pub stats: RefCell<SearchStats>,
}

impl StaticContext {
    pub fn new(
        program: &Program,
        registry: TacticRegistry,
        target: &MethodDecl,
        tac_call: &CallStmt,
        oracle: Option<SharedOracle>,
    ) -> Rc<Self> {
        let mut datatypes = HashMap::new();
        let mut members = HashMap::new();
        for decl in &program.decls {
            match decl {
                Decl::Datatype(d) => {
                    datatypes.insert(d.name.node.clone(), d.clone());
                }
                Decl::Method(m) => {
                    members.insert(m.name.node.clone(), m.clone());
                }
                Decl::Tactic(_) => {}
            }
        }
        Rc::new(Self {
            program: program.clone(),
            datatypes,
            members,
            registry,
            target: target.clone(),
            tac_call: tac_call.clone(),
            oracle,
            variables: RefCell::new(Vec::new()),
            resolved: RefCell::new(Vec::new()),
            new_target: RefCell::new(None),
            stats: RefCell::new(SearchStats::default()),
        })
    }

    pub fn datatype(&self, name: &str) -> Option<&DatatypeDecl> {
        self.datatypes.get(name)
    }

    pub fn member(&self, name: &str) -> Option<&MethodDecl> {
        self.members.get(name)
    }

    /// Register program variables in scope at the call site. Later
    /// registrations replace earlier ones of the same name.
    pub fn register_variables(&self, vars: impl IntoIterator<Item = Formal>) {
        let mut pool = self.variables.borrow_mut();
        for var in vars {
            if let Some(existing) = pool.iter_mut().find(|v| v.name.node == var.name.node) {
                *existing = var;
            } else {
                pool.push(var);
            }
        }
    }

    pub fn remove_variable(&self, name: &str) {
        self.variables.borrow_mut().retain(|v| v.name.node != name);
    }

    pub fn variables(&self) -> Vec<Formal> {
        self.variables.borrow().clone()
    }

    pub fn variable_type(&self, name: &str) -> Option<Type> {
        self.variables
            .borrow()
            .iter()
            .find(|v| v.name.node == name)
            .map(|v| v.ty.clone())
    }

    pub fn add_total_branches(&self, n: u64) {
        self.stats.borrow_mut().total_branches += n;
    }

    pub fn add_discarded_branches(&self, n: u64) {
        self.stats.borrow_mut().discarded_branches += n;
    }
}

/// Replacement map from original statement to rewritten statement,
/// keyed by span identity, in insertion order.
#[derive(Clone, Debug, Default)]
pub struct UpdatedMap {
    entries: Vec<(Stmt, Stmt)>,
}

impl UpdatedMap {
    pub fn insert(&mut self, key: Stmt, value: Stmt) {
        if let Some(slot) = self
            .entries
            .iter_mut()
            .find(|(k, _)| same_site(k.span(), key.span()))
        {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn remove(&mut self, key_span: Span) {
        self.entries.retain(|(k, _)| !same_site(k.span(), key_span));
    }

    pub fn get(&self, key_span: Span) -> Option<&Stmt> {
        self.entries
            .iter()
            .find(|(k, _)| same_site(k.span(), key_span))
            .map(|(_, v)| v)
    }

    pub fn values(&self) -> Vec<Stmt> {
        self.entries.iter().map(|(_, v)| v.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Stmt, Stmt)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Values of entries not present in `baseline`: the statements a
    /// nested body resolution contributed on top of its parent.
    pub fn values_since(&self, baseline: &UpdatedMap) -> Vec<Stmt> {
        self.entries
            .iter()
            .filter(|(k, v)| baseline.get(k.span()).map(|old| old != v).unwrap_or(true))
            .map(|(_, v)| v.clone())
            .collect()
    }
}

/// Per-branch state: structurally copied at every fork of the search,
/// never aliased between live branches.
#[derive(Clone)]
pub struct DynamicContext {
    /// The member the tactic is rewriting (a private copy).
    pub member: MethodDecl,
    pub tactic: Rc<TacticDecl>,
    /// The call being resolved; for nested applications this is the
    /// inner call, not the top-level site.
    pub tac_call: CallStmt,
    /// The statement list being walked, with its position counter. The
    /// body is swapped out when a nested block is resolved.
    pub body: Rc<Vec<Stmt>>,
    counter: usize,
    bindings: Vec<(Formal, Option<Value>)>,
    pub updated: UpdatedMap,
    pub generated_exprs: Vec<Expr>,
    /// Loop the call site rides on, if any; anchors `loop_guard` and
    /// `add_invariant`.
    pub enclosing_loop: Option<WhileStmt>,
    /// True while a residual construct (an executed loop body) still
    /// needs the search to re-enter this statement.
    pub partially_resolved: bool,
    pub new_target: Option<MethodDecl>,
    /// Constructor whose arm body is being resolved, during case splits.
    pub active_ctor: Option<String>,
}

impl DynamicContext {
    pub fn new(member: &MethodDecl, tactic: Rc<TacticDecl>, tac_call: &CallStmt) -> Self {
        let body = Rc::new(tactic.body.stmts.clone());
        Self {
            member: member.clone(),
            tactic,
            tac_call: tac_call.clone(),
            body,
            counter: 0,
            bindings: Vec::new(),
            updated: UpdatedMap::default(),
            generated_exprs: Vec::new(),
            enclosing_loop: None,
            partially_resolved: false,
            new_target: None,
            active_ctor: None,
        }
    }

    /// Bind the call's actual arguments to the tactic's formals, as-is.
    /// Arity is the caller's responsibility to have checked.
    pub fn fill_tactic_inputs(&mut self) {
        self.bindings.clear();
        let formals = self.tactic.params.clone();
        let actuals = self.tac_call.call.args.clone();
        for (formal, actual) in formals.into_iter().zip(actuals) {
            self.bindings.push((formal, Some(Value::Expr(actual))));
        }
    }

    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn set_counter(&mut self, value: usize) {
        self.counter = value;
    }

    pub fn inc_counter(&mut self) {
        debug_assert!(
            self.counter < self.body.len(),
            "tactic counter exceeded tactic body length"
        );
        self.counter += 1;
    }

    pub fn reset_counter(&mut self) {
        self.counter = 0;
    }

    pub fn is_resolved(&self) -> bool {
        self.counter >= self.body.len()
    }

    pub fn current_stmt(&self) -> Option<&Stmt> {
        self.body.get(self.counter)
    }

    pub fn has_local(&self, name: &str) -> bool {
        self.bindings.iter().any(|(f, _)| f.name.node == name)
    }

    pub fn local_value(&self, name: &str) -> Option<&Value> {
        self.bindings
            .iter()
            .find(|(f, _)| f.name.node == name)
            .and_then(|(_, v)| v.as_ref())
    }

    pub fn local_key(&self, name: &str) -> Option<&Formal> {
        self.bindings
            .iter()
            .find(|(f, _)| f.name.node == name)
            .map(|(f, _)| f)
    }

    /// Bind or rebind a local.
    pub fn add_local(&mut self, key: Formal, value: Option<Value>) {
        if let Some(slot) = self
            .bindings
            .iter_mut()
            .find(|(f, _)| f.name.node == key.name.node)
        {
            slot.1 = value;
        } else {
            self.bindings.push((key, value));
        }
    }

    pub fn remove_local(&mut self, name: &str) {
        self.bindings.retain(|(f, _)| f.name.node != name);
    }

    pub fn add_updated(&mut self, key: Stmt, value: Stmt) {
        self.updated.insert(key, value);
    }

    pub fn all_updated(&self) -> Vec<Stmt> {
        self.updated.values()
    }
}
