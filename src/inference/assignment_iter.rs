//! Innermost successor layer: assigning the rule variables a match left
//! unbound.

use super::matching::Candidate;
use super::proof_state::ProofState;
use super::succ_iter::{StepContext, SuccessorIter};
use crate::data::Statement;
use std::cell::OnceCell;
use std::rc::Rc;

/// Enumerates every assignment of candidates to `remaining`, one id per
/// nesting level.  With nothing left to assign the iterator is a leaf
/// holding exactly one successor, whose proof state is only built when
/// first asked for.
pub struct FreeVarAssignmentIter {
    step: Rc<StepContext>,
    stmt: Statement,
    remaining: Vec<usize>,
    candidates: Vec<Candidate>,
    next_candidate: usize,
    child: Option<Box<FreeVarAssignmentIter>>,
    leaf: Option<Statement>,
    leaf_state: OnceCell<Rc<ProofState>>,
}

impl FreeVarAssignmentIter {
    pub(crate) fn new(step: Rc<StepContext>, stmt: Statement, remaining: Vec<usize>) -> Self {
        let mut iter = Self {
            step,
            stmt,
            remaining,
            candidates: Vec::new(),
            next_candidate: 0,
            child: None,
            leaf: None,
            leaf_state: OnceCell::new(),
        };
        if iter.remaining.is_empty() {
            iter.leaf = Some(iter.stmt.clone());
        } else {
            iter.candidates = iter.step.candidates.clone();
            if iter.step.kernel.randomised() {
                iter.step.kernel.shuffle(&mut iter.candidates);
            }
            iter.descend();
        }
        iter
    }

    fn descend(&mut self) {
        let id = self.remaining[0];
        while self.next_candidate < self.candidates.len() {
            let candidate = self.candidates[self.next_candidate];
            self.next_candidate += 1;
            let child = FreeVarAssignmentIter::new(
                self.step.clone(),
                candidate.assign(&self.stmt, id),
                self.remaining[1..].to_vec(),
            );
            if child.valid() {
                self.child = Some(Box::new(child));
                return;
            }
        }
        self.child = None;
    }
}

impl SuccessorIter for FreeVarAssignmentIter {
    fn valid(&self) -> bool {
        self.leaf.is_some() || self.child.is_some()
    }

    fn get(&self) -> Rc<ProofState> {
        if let Some(leaf) = &self.leaf {
            return self
                .leaf_state
                .get_or_init(|| ProofState::child(&self.step.parent(), leaf.clone()))
                .clone();
        }
        self.child
            .as_ref()
            .expect("get() on an exhausted assignment iterator")
            .get()
    }

    fn get_forefront(&self) -> Statement {
        if let Some(leaf) = &self.leaf {
            return leaf.clone();
        }
        self.child
            .as_ref()
            .expect("get_forefront() on an exhausted assignment iterator")
            .get_forefront()
    }

    fn advance(&mut self) {
        if self.leaf.take().is_some() {
            self.leaf_state.take();
            return;
        }
        let child = self
            .child
            .as_mut()
            .expect("advance() on an exhausted assignment iterator");
        child.advance();
        if !child.valid() {
            self.descend();
        }
    }

    fn size(&self) -> usize {
        match (&self.leaf, &self.child) {
            (Some(_), _) => 1,
            (None, Some(child)) => child.size() * (1 + self.candidates.len() - self.next_candidate),
            (None, None) => 0,
        }
    }
}
