//! Outermost successor layer: every sub-expression of the forefront is a
//! candidate rewrite site, visited in pre-order, left side first.

use super::proof_state::ProofState;
use super::rule_iter::RuleMatchingIter;
use super::succ_iter::{StepContext, SuccessorIter};
use crate::data::{Statement, StmtIter};
use std::rc::Rc;

pub struct SubExprMatchingIter {
    step: Rc<StepContext>,
    positions: StmtIter,
    child: Option<Box<RuleMatchingIter>>,
}

impl SubExprMatchingIter {
    pub(crate) fn new(step: Rc<StepContext>) -> Self {
        let positions = step.forefront.iter();
        let mut iter = Self {
            step,
            positions,
            child: None,
        };
        iter.descend();
        iter
    }

    fn descend(&mut self) {
        for pos in self.positions.by_ref() {
            let child = RuleMatchingIter::new(self.step.clone(), pos);
            if child.valid() {
                self.child = Some(Box::new(child));
                return;
            }
        }
        self.child = None;
    }
}

impl SuccessorIter for SubExprMatchingIter {
    fn valid(&self) -> bool {
        self.child.is_some()
    }

    fn get(&self) -> Rc<ProofState> {
        self.child
            .as_ref()
            .expect("get() on an exhausted sub-expression iterator")
            .get()
    }

    fn get_forefront(&self) -> Statement {
        self.child
            .as_ref()
            .expect("get_forefront() on an exhausted sub-expression iterator")
            .get_forefront()
    }

    fn advance(&mut self) {
        let child = self
            .child
            .as_mut()
            .expect("advance() on an exhausted sub-expression iterator");
        child.advance();
        if !child.valid() {
            self.descend();
        }
    }

    fn size(&self) -> usize {
        self.child.as_ref().map_or(0, |child| child.size())
    }
}
