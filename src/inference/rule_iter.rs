//! Second successor layer: active rules applicable at one position.

use super::match_results_iter::MatchResultsIter;
use super::proof_state::ProofState;
use super::succ_iter::{StepContext, SuccessorIter};
use crate::data::{Expression, Statement, StmtPosition};
use bitvec::vec::BitVec;
use std::rc::Rc;

/// Walks the active rules for one sub-expression.  In ordered mode rules are
/// scanned by index; in randomised mode each next rule is drawn uniformly
/// from those not yet tried.  A rule is tried at most once.
pub struct RuleMatchingIter {
    step: Rc<StepContext>,
    pos: StmtPosition,
    subexpr: Expression,
    num_rules: usize,
    next_rule: usize,
    tried: BitVec,
    num_tried: usize,
    child: Option<Box<MatchResultsIter>>,
}

impl RuleMatchingIter {
    pub(crate) fn new(step: Rc<StepContext>, pos: StmtPosition) -> Self {
        let subexpr = step.forefront.at(&pos);
        let num_rules = step.kernel.num_active_rules();
        let mut iter = Self {
            step,
            pos,
            subexpr,
            num_rules,
            next_rule: 0,
            tried: BitVec::repeat(false, num_rules),
            num_tried: 0,
            child: None,
        };
        iter.descend();
        iter
    }

    fn pick_rule(&mut self) -> Option<usize> {
        if self.step.kernel.randomised() {
            if self.num_tried == self.num_rules {
                return None;
            }
            let nth = self.step.kernel.random_below(self.num_rules - self.num_tried);
            let idx = self.tried.iter_zeros().nth(nth)?;
            self.tried.set(idx, true);
            self.num_tried += 1;
            Some(idx)
        } else {
            (self.next_rule < self.num_rules).then(|| {
                self.next_rule += 1;
                self.next_rule - 1
            })
        }
    }

    fn descend(&mut self) {
        while let Some(rule_idx) = self.pick_rule() {
            let results = self.step.kernel.match_results(&self.subexpr, rule_idx);
            if results.is_empty() {
                continue;
            }
            let child = MatchResultsIter::new(self.step.clone(), self.pos, results);
            if child.valid() {
                self.child = Some(Box::new(child));
                return;
            }
        }
        self.child = None;
    }

    fn rules_left(&self) -> usize {
        if self.step.kernel.randomised() {
            self.num_rules - self.num_tried
        } else {
            self.num_rules - self.next_rule
        }
    }
}

impl SuccessorIter for RuleMatchingIter {
    fn valid(&self) -> bool {
        self.child.is_some()
    }

    fn get(&self) -> Rc<ProofState> {
        self.child
            .as_ref()
            .expect("get() on an exhausted rule iterator")
            .get()
    }

    fn get_forefront(&self) -> Statement {
        self.child
            .as_ref()
            .expect("get_forefront() on an exhausted rule iterator")
            .get_forefront()
    }

    fn advance(&mut self) {
        let child = self
            .child
            .as_mut()
            .expect("advance() on an exhausted rule iterator");
        child.advance();
        if !child.valid() {
            self.descend();
        }
    }

    fn size(&self) -> usize {
        self.child.as_ref().map_or(0, |child| child.size()) + self.rules_left()
    }
}
