//! Builds the successor cursors a solver walks.

use super::heuristic::Heuristic;
use super::stopping::{BasicStoppingStrategy, FixedStoppingStrategy, StoppingStrategyPtr};
use super::stopping_iter::StoppingIterator;
use crate::inference::{KnowledgeKernel, ProofState, SuccIterPtr};
use std::fmt;
use std::rc::Rc;

type StrategyFactory = Box<dyn Fn() -> StoppingStrategyPtr>;

/// Hands out successor iterators for proof states, wrapped in a
/// [`StoppingIterator`] when both a heuristic and a stopping strategy are
/// configured.
pub struct IteratorManager {
    kernel: Rc<KnowledgeKernel>,
    heuristic: Option<Rc<dyn Heuristic>>,
    strategy_factory: Option<StrategyFactory>,
}

impl IteratorManager {
    pub fn new(kernel: Rc<KnowledgeKernel>) -> Self {
        Self {
            kernel,
            heuristic: None,
            strategy_factory: None,
        }
    }

    pub fn kernel(&self) -> &Rc<KnowledgeKernel> {
        &self.kernel
    }

    pub fn set_heuristic(&mut self, heuristic: Option<Rc<dyn Heuristic>>) {
        self.heuristic = heuristic;
    }

    pub fn heuristic(&self) -> Option<&Rc<dyn Heuristic>> {
        self.heuristic.as_ref()
    }

    pub fn reset_stopping_strategy(&mut self) {
        self.strategy_factory = None;
    }

    pub fn set_fixed_stopping_strategy(&mut self, size: usize) {
        assert!(size >= 1, "fixed stopping strategy needs a positive size");
        self.strategy_factory = Some(Box::new(move || Box::new(FixedStoppingStrategy::new(size))));
    }

    pub fn set_basic_stopping_strategy(&mut self, initial_fill: usize, lambda: f32, alpha: f32) {
        assert!(initial_fill > 1 && lambda > 0.0 && alpha > 0.0 && alpha < 1.0);
        self.strategy_factory = Some(Box::new(move || {
            Box::new(BasicStoppingStrategy::new(initial_fill, lambda, alpha))
        }));
    }

    pub fn has_stopping_strategy(&self) -> bool {
        self.strategy_factory.is_some()
    }

    pub fn begin_iteration_of(&self, state: &ProofState) -> SuccIterPtr {
        let iter = state.succ_begin();
        match (&self.heuristic, &self.strategy_factory) {
            (Some(heuristic), Some(factory)) => {
                Box::new(StoppingIterator::new(iter, factory(), heuristic.clone()))
            }
            _ => iter,
        }
    }
}

impl fmt::Debug for IteratorManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IteratorManager")
            .field("heuristic", &self.heuristic.is_some())
            .field("stopping_strategy", &self.strategy_factory.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::IteratorManager;
    use crate::data::ModelContext;
    use crate::inference::{KernelSettings, KnowledgeKernel, Successors};
    use crate::parser::parse_statement;
    use crate::search::EditDistanceHeuristic;
    use std::rc::Rc;

    fn kernel() -> Rc<KnowledgeKernel> {
        let ctx = ModelContext::builder("group")
            .define("e", 0)
            .and_then(|b| b.define("i", 1))
            .and_then(|b| b.define("*", 2))
            .map(|b| b.axiom("*(x, e) = x").axiom("*(e, x) = x"))
            .and_then(|b| b.build())
            .expect("context");
        Rc::new(KnowledgeKernel::new(Rc::new(ctx), KernelSettings::default()).expect("kernel"))
    }

    #[test]
    fn strategy_without_heuristic_is_plain() {
        let ker = kernel();
        let target = parse_statement(&ker.context(), "i(x) = *(x, e)").expect("target");
        let state = ker.begin_proof_of(&target);
        let plain: Vec<String> = state.successors().map(|s| s.forefront().to_str()).collect();

        let mut mgr = IteratorManager::new(ker.clone());
        mgr.set_fixed_stopping_strategy(2);
        let managed: Vec<String> = Successors::new(mgr.begin_iteration_of(&state))
            .map(|s| s.forefront().to_str())
            .collect();
        assert_eq!(plain, managed);
    }

    #[test]
    fn heuristic_and_strategy_reorder_but_keep_successors() {
        let ker = kernel();
        let target = parse_statement(&ker.context(), "i(x) = *(x, e)").expect("target");
        let state = ker.begin_proof_of(&target);
        let mut plain: Vec<String> = state.successors().map(|s| s.forefront().to_str()).collect();

        let mut mgr = IteratorManager::new(ker.clone());
        mgr.set_heuristic(Some(Rc::new(EditDistanceHeuristic::new(1.0, 1.0))));
        mgr.set_basic_stopping_strategy(2, 1.0, 0.5);
        assert!(mgr.has_stopping_strategy());
        let mut managed: Vec<String> = Successors::new(mgr.begin_iteration_of(&state))
            .map(|s| s.forefront().to_str())
            .collect();
        plain.sort();
        managed.sort();
        assert_eq!(plain, managed);

        mgr.reset_stopping_strategy();
        assert!(!mgr.has_stopping_strategy());
    }
}
