//! Filter dropping successors that revisit a statement of the current path.

use super::proof_state::ProofState;
use super::succ_iter::{SuccIterPtr, SuccessorIter};
use crate::data::Statement;
use std::rc::Rc;

/// Skips every successor whose forefront is equivalent to a statement on
/// the path from the target to the state being expanded.
pub struct NoRepeatIter {
    path: Vec<Statement>,
    inner: SuccIterPtr,
}

impl NoRepeatIter {
    pub fn new(path: Vec<Statement>, inner: SuccIterPtr) -> Self {
        let mut iter = Self { path, inner };
        iter.skip_repeats();
        iter
    }

    fn is_repeat(&self, stmt: &Statement) -> bool {
        self.path.iter().any(|seen| seen.equivalent(stmt))
    }

    fn skip_repeats(&mut self) {
        while self.inner.valid() && self.is_repeat(&self.inner.get_forefront()) {
            self.inner.advance();
        }
    }
}

impl SuccessorIter for NoRepeatIter {
    fn valid(&self) -> bool {
        self.inner.valid()
    }

    fn get(&self) -> Rc<ProofState> {
        self.inner.get()
    }

    fn get_forefront(&self) -> Statement {
        self.inner.get_forefront()
    }

    fn advance(&mut self) {
        self.inner.advance();
        self.skip_repeats();
    }

    fn size(&self) -> usize {
        self.inner.size()
    }
}
