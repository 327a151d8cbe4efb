#![forbid(unsafe_code)]

use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{debug, trace};

use veil_ast::SearchHint;

use crate::assemble::verify_candidate;
use crate::error::TacticError;
use crate::solution::Solution;
use crate::state::ProofState;

pub type Candidates = Box<dyn Iterator<Item = Result<Solution, TacticError>>>;

/// Search a tactic body, picking the traversal order from the tactic's
/// own hint.
pub fn run(state: ProofState, verify: bool) -> Candidates {
    let hint = state.dynamic.tactic.search;
    run_with(state, hint, verify)
}

pub fn run_with(state: ProofState, hint: SearchHint, verify: bool) -> Candidates {
    debug!(
        tactic = %state.dynamic.tactic.name.node,
        strategy = ?hint,
        verify,
        "starting tactic search"
    );
    match hint {
        SearchHint::Bfs => Box::new(Bfs::new(state, verify)),
        SearchHint::Dfs => Box::new(Dfs::new(state, verify)),
    }
}

/// Search for a nested statement list. Blocks always run breadth-first
/// and never verify; verification belongs to the enclosing search.
pub fn run_block(state: ProofState) -> Candidates {
    Box::new(Bfs::new(state, false))
}

/// Seed enumerator for a fresh search: an already-resolved body (an
/// empty block) contributes its state as the one trivial candidate.
fn initial(state: ProofState) -> Candidates {
    let solution = Solution::new(state);
    if solution.is_resolved() {
        Box::new(std::iter::once(Ok(solution)))
    } else {
        resolve_statement(solution)
    }
}

/// Step one solution: resolve the statement under the body counter into
/// its candidate children. Children keep the parent link; the counter
/// advances unless the statement left a residual construct behind.
pub fn resolve_statement(solution: Solution) -> Candidates {
    if solution.state.dynamic.is_resolved() {
        return Box::new(std::iter::empty());
    }
    let Some(stmt) = solution.state.dynamic.current_stmt().cloned() else {
        return Box::new(std::iter::empty());
    };
    match solution.state.call_atomic(&stmt) {
        Err(e) => Box::new(std::iter::once(Err(e))),
        Ok(children) => {
            let parent = Rc::new(solution);
            Box::new(children.map(move |r| {
                r.map(|mut child| {
                    child.state.statics.add_total_branches(1);
                    child.parent = Some(Rc::clone(&parent));
                    if !child.state.dynamic.partially_resolved {
                        child.state.dynamic.inc_counter();
                    }
                    child
                })
            }))
        }
    }
}

/// Handle one evaluated (fully or partially) solution under the active
/// verification mode. Shared by both traversal orders.
enum Step {
    Yield(Solution),
    YieldAndHalt(Solution),
    Requeue(Solution),
    Drop,
    Fail(TacticError),
}

fn step_evaluated(solution: Solution, verify: bool) -> Step {
    let partial = solution.is_partially_resolved();
    if !verify {
        return Step::Yield(solution);
    }
    match verify_candidate(&solution) {
        Err(e) => Step::Fail(e),
        Ok(true) => {
            trace!("candidate verified, halting search");
            Step::YieldAndHalt(solution)
        }
        Ok(false) => {
            solution.state.statics.add_discarded_branches(1);
            if partial {
                // the residual part may still resolve into something
                // the oracle accepts
                Step::Requeue(solution)
            } else {
                Step::Drop
            }
        }
    }
}

struct Bfs {
    queue: VecDeque<Candidates>,
    verify: bool,
    done: bool,
}

impl Bfs {
    fn new(state: ProofState, verify: bool) -> Self {
        let mut queue = VecDeque::new();
        queue.push_back(initial(state));
        Self {
            queue,
            verify,
            done: false,
        }
    }
}

impl Iterator for Bfs {
    type Item = Result<Solution, TacticError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let mut en = self.queue.pop_front()?;
            let Some(item) = en.next() else {
                // this enumerator is exhausted
                continue;
            };
            self.queue.push_back(en);
            let solution = match item {
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
                Ok(s) => s,
            };
            if solution.is_resolved() || solution.is_partially_resolved() {
                match step_evaluated(solution, self.verify) {
                    Step::Fail(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                    Step::YieldAndHalt(s) => {
                        self.done = true;
                        return Some(Ok(s));
                    }
                    Step::Yield(s) => {
                        if s.is_partially_resolved() {
                            self.queue.push_back(resolve_statement(s.clone()));
                        }
                        return Some(Ok(s));
                    }
                    Step::Requeue(s) => {
                        self.queue.push_back(resolve_statement(s));
                        continue;
                    }
                    Step::Drop => continue,
                }
            } else {
                self.queue.push_back(resolve_statement(solution));
            }
        }
    }
}

struct Dfs {
    stack: Vec<Candidates>,
    verify: bool,
    done: bool,
}

impl Dfs {
    fn new(state: ProofState, verify: bool) -> Self {
        Self {
            stack: vec![initial(state)],
            verify,
            done: false,
        }
    }
}

impl Iterator for Dfs {
    type Item = Result<Solution, TacticError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let mut en = self.stack.pop()?;
            let Some(item) = en.next() else {
                continue;
            };
            self.stack.push(en);
            let solution = match item {
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
                Ok(s) => s,
            };
            if solution.is_resolved() || solution.is_partially_resolved() {
                match step_evaluated(solution, self.verify) {
                    Step::Fail(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                    Step::YieldAndHalt(s) => {
                        self.done = true;
                        return Some(Ok(s));
                    }
                    Step::Yield(s) => {
                        if s.is_partially_resolved() {
                            self.stack.push(resolve_statement(s.clone()));
                        }
                        return Some(Ok(s));
                    }
                    Step::Requeue(s) => {
                        self.stack.push(resolve_statement(s));
                        continue;
                    }
                    Step::Drop => continue,
                }
            } else {
                self.stack.push(resolve_statement(solution));
            }
        }
    }
}
