#![forbid(unsafe_code)]

use std::rc::Rc;

use crate::state::ProofState;

/// One candidate state of an in-progress tactic expansion. Solutions
/// form a tree through the parent links as statements fan out into
/// alternative resolutions; only a leaf may be final.
#[derive(Clone)]
pub struct Solution {
    pub state: ProofState,
    pub parent: Option<Rc<Solution>>,
    pub is_final: bool,
}

impl Solution {
    pub fn new(state: ProofState) -> Self {
        Self {
            state,
            parent: None,
            is_final: false,
        }
    }

    pub fn with_parent(state: ProofState, parent: Rc<Solution>) -> Self {
        Self {
            state,
            parent: Some(parent),
            is_final: false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.state.dynamic.is_resolved()
    }

    pub fn is_partially_resolved(&self) -> bool {
        self.state.dynamic.partially_resolved
    }

    /// Promote this solution to the session's answer: copy the updated
    /// statements into the static `resolved` list, install the rewritten
    /// target, and return the terminal leaf marked final.
    pub fn finalize(&self) -> Solution {
        let statics = &self.state.statics;
        {
            let mut resolved = statics.resolved.borrow_mut();
            resolved.clear();
            resolved.extend(self.state.dynamic.all_updated());
        }
        *statics.new_target.borrow_mut() = self.state.dynamic.new_target.clone();
        Solution {
            state: self.state.clone(),
            parent: Some(Rc::new(self.clone())),
            is_final: true,
        }
    }

    /// Depth of this solution in the solution tree.
    pub fn depth(&self) -> usize {
        let mut d = 0;
        let mut cur = self.parent.clone();
        while let Some(p) = cur {
            d += 1;
            cur = p.parent.clone();
        }
        d
    }
}
