//! Best-first buffering over a successor cursor.

use super::heuristic::Heuristic;
use super::stopping::{OrderedBenefit, StoppingStrategyPtr};
use crate::inference::{ProofState, SuccIterPtr, SuccessorIter};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Smallest cost reported to a strategy; clock resolution can make an
/// extraction look free.
const MIN_COST_SECS: f32 = 1e-9;

/// Wall clock timer for extraction costs.
#[derive(Clone, Copy, Debug)]
pub struct Stopwatch {
    started: Option<Instant>,
    elapsed: Duration,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self {
            started: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Stops the clock and returns the time since the last `start`.
    pub fn stop(&mut self) -> Duration {
        if let Some(started) = self.started.take() {
            self.elapsed = started.elapsed();
        }
        self.elapsed
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

struct Buffered {
    benefit: OrderedBenefit,
    seq: usize,
    state: Rc<ProofState>,
}

impl PartialEq for Buffered {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Buffered {}

impl PartialOrd for Buffered {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Buffered {
    // Higher benefit first; ties go to the earlier extraction.
    fn cmp(&self, other: &Self) -> Ordering {
        self.benefit
            .cmp(&other.benefit)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Pulls successors from `child` until the strategy is satisfied, then
/// serves them highest predicted benefit first.  Each extraction is timed
/// and the (benefit, cost) pair is reported to the strategy.
pub struct StoppingIterator {
    child: SuccIterPtr,
    strategy: StoppingStrategyPtr,
    heuristic: Rc<dyn Heuristic>,
    buffer: BinaryHeap<Buffered>,
    extracted: usize,
}

impl StoppingIterator {
    pub fn new(child: SuccIterPtr, strategy: StoppingStrategyPtr, heuristic: Rc<dyn Heuristic>) -> Self {
        let mut iter = Self {
            child,
            strategy,
            heuristic,
            buffer: BinaryHeap::new(),
            extracted: 0,
        };
        iter.forward();
        iter
    }

    /// Number of successors pulled from the child so far.
    pub fn extracted(&self) -> usize {
        self.extracted
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn forward(&mut self) {
        let mut watch = Stopwatch::new();
        while !self.strategy.is_stopped() && self.child.valid() {
            watch.start();
            let state = self.child.get();
            self.child.advance();
            let benefit = self.heuristic.predict(&state);
            let cost = watch.stop().as_secs_f32().max(MIN_COST_SECS);

            self.strategy.add(benefit, cost);
            self.buffer.push(Buffered {
                benefit: OrderedBenefit(benefit),
                seq: self.extracted,
                state,
            });
            self.extracted += 1;
        }
    }
}

impl SuccessorIter for StoppingIterator {
    fn valid(&self) -> bool {
        !self.buffer.is_empty()
    }

    fn get(&self) -> Rc<ProofState> {
        self.buffer
            .peek()
            .expect("get() on an exhausted stopping iterator")
            .state
            .clone()
    }

    fn advance(&mut self) {
        assert!(self.buffer.pop().is_some(), "advance() on an exhausted stopping iterator");
        // While the child is live the strategy is what ended the last fill.
        if self.child.valid() {
            self.strategy.max_removed();
        }
        self.forward();
    }

    fn size(&self) -> usize {
        if self.child.valid() {
            self.buffer.len() * self.child.size()
        } else {
            self.buffer.len()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Stopwatch, StoppingIterator};
    use crate::data::ModelContext;
    use crate::inference::{KernelSettings, KnowledgeKernel, ProofState, SuccessorIter, Successors};
    use crate::parser::parse_statement;
    use crate::search::{FixedStoppingStrategy, Heuristic};
    use std::rc::Rc;

    /// Prefers short forefronts.
    struct ShortFirst;

    impl Heuristic for ShortFirst {
        fn predict(&self, state: &ProofState) -> f32 {
            -(state.forefront().to_str().len() as f32)
        }
    }

    fn kernel() -> Rc<KnowledgeKernel> {
        let ctx = ModelContext::builder("group")
            .define("e", 0)
            .and_then(|b| b.define("i", 1))
            .and_then(|b| b.define("*", 2))
            .map(|b| {
                b.axiom("*(*(x, y), z) = *(x, *(y, z))")
                    .axiom("*(x, e) = x")
                    .axiom("*(e, x) = x")
                    .axiom("*(x, i(x)) = e")
                    .axiom("*(i(x), x) = e")
            })
            .and_then(|b| b.build())
            .expect("context");
        Rc::new(KnowledgeKernel::new(Rc::new(ctx), KernelSettings::default()).expect("kernel"))
    }

    #[test]
    fn stopwatch_reports_last_interval() {
        let mut watch = Stopwatch::new();
        watch.start();
        let elapsed = watch.stop();
        assert_eq!(elapsed, watch.elapsed());
    }

    #[test]
    fn serves_every_successor_exactly_once() {
        let ker = kernel();
        let target = parse_statement(&ker.context(), "*(x, e) = i(i(x))").expect("target");
        let state = ker.begin_proof_of(&target);
        let plain: Vec<String> = state.successors().map(|s| s.forefront().to_str()).collect();

        let stopping = StoppingIterator::new(
            state.succ_begin(),
            Box::new(FixedStoppingStrategy::new(3)),
            Rc::new(ShortFirst),
        );
        let mut served: Vec<String> = Successors::new(Box::new(stopping))
            .map(|s| s.forefront().to_str())
            .collect();

        let mut expected = plain;
        expected.sort();
        served.sort();
        assert_eq!(served, expected);
    }

    #[test]
    fn buffered_items_come_out_best_first() {
        let ker = kernel();
        let target = parse_statement(&ker.context(), "*(x, e) = i(i(x))").expect("target");
        let state = ker.begin_proof_of(&target);
        let total = state.successors().count();

        let mut stopping = StoppingIterator::new(
            state.succ_begin(),
            Box::new(FixedStoppingStrategy::new(total)),
            Rc::new(ShortFirst),
        );
        assert_eq!(stopping.buffered(), total);
        let mut last = 0;
        while stopping.valid() {
            let len = stopping.get().forefront().to_str().len();
            assert!(len >= last);
            last = len;
            stopping.advance();
        }
        assert_eq!(stopping.size(), 0);
    }
}
