//! Third successor layer: the distinct rewrites one rule offers at one
//! position.

use super::assignment_iter::FreeVarAssignmentIter;
use super::matching::MatchResult;
use super::proof_state::ProofState;
use super::succ_iter::{StepContext, SuccessorIter};
use crate::data::{Statement, StmtPosition};
use std::rc::Rc;

pub struct MatchResultsIter {
    step: Rc<StepContext>,
    pos: StmtPosition,
    results: Vec<MatchResult>,
    next_result: usize,
    child: Option<Box<FreeVarAssignmentIter>>,
}

impl MatchResultsIter {
    pub(crate) fn new(step: Rc<StepContext>, pos: StmtPosition, results: Vec<MatchResult>) -> Self {
        let mut iter = Self {
            step,
            pos,
            results,
            next_result: 0,
            child: None,
        };
        iter.descend();
        iter
    }

    fn descend(&mut self) {
        while self.next_result < self.results.len() {
            let result = &self.results[self.next_result];
            self.next_result += 1;
            let rewritten = self.step.forefront.replace(&self.pos, &result.replacement);
            let child = FreeVarAssignmentIter::new(self.step.clone(), rewritten, result.unbound.clone());
            if child.valid() {
                self.child = Some(Box::new(child));
                return;
            }
        }
        self.child = None;
    }
}

impl SuccessorIter for MatchResultsIter {
    fn valid(&self) -> bool {
        self.child.is_some()
    }

    fn get(&self) -> Rc<ProofState> {
        self.child
            .as_ref()
            .expect("get() on an exhausted match results iterator")
            .get()
    }

    fn get_forefront(&self) -> Statement {
        self.child
            .as_ref()
            .expect("get_forefront() on an exhausted match results iterator")
            .get_forefront()
    }

    fn advance(&mut self) {
        let child = self
            .child
            .as_mut()
            .expect("advance() on an exhausted match results iterator");
        child.advance();
        if !child.valid() {
            self.descend();
        }
    }

    fn size(&self) -> usize {
        self.child.as_ref().map_or(0, |child| child.size())
            + (self.results.len() - self.next_result)
    }
}
