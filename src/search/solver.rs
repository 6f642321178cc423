//! Iterative deepening over proof states.

use super::iter_manager::IteratorManager;
use super::stopping_iter::Stopwatch;
use crate::config::{Counter, Statistics};
use crate::data::StatementArray;
use crate::inference::{KnowledgeKernel, ProofCompletionState, ProofState, SuccIterPtr};
use std::rc::Rc;
use tracing::{debug, info};

pub const DEFAULT_MAX_DEPTH: usize = 10;
pub const DEFAULT_STARTING_DEPTH: usize = 3;

struct Frame {
    state: Rc<ProofState>,
    iter: SuccIterPtr,
}

/// Search state of one target.
struct TargetSearch {
    root: Rc<ProofState>,
    stack: Vec<Frame>,
    depth_limit: usize,
    /// A state was left unexpanded by the depth limit during this pass.
    cut_off: bool,
    status: ProofCompletionState,
    proof: Option<Rc<ProofState>>,
    agg_time: f32,
    expansions: usize,
}

/// Depth-first search with a depth limit that grows by one each time the
/// tree below the limit is exhausted, up to `max_depth`.
///
/// Every target keeps its own stack of (proof state, successor cursor)
/// frames, so a search can be advanced in bounded `step`s with arbitrary
/// work in between.
pub struct IterativeDeepeningSolver {
    kernel: Rc<KnowledgeKernel>,
    iter_mgr: IteratorManager,
    max_depth: usize,
    starting_depth: usize,
    targets: Option<StatementArray>,
    searches: Vec<TargetSearch>,
    stats: Statistics,
}

impl IterativeDeepeningSolver {
    pub fn new(iter_mgr: IteratorManager, max_depth: usize, starting_depth: usize) -> Self {
        assert!(starting_depth >= 1, "starting depth must be positive");
        assert!(max_depth > starting_depth, "max depth must exceed the starting depth");
        Self {
            kernel: iter_mgr.kernel().clone(),
            iter_mgr,
            max_depth,
            starting_depth,
            targets: None,
            searches: Vec::new(),
            stats: Statistics::new(),
        }
    }

    pub fn with_defaults(kernel: Rc<KnowledgeKernel>) -> Self {
        Self::new(IteratorManager::new(kernel), DEFAULT_MAX_DEPTH, DEFAULT_STARTING_DEPTH)
    }

    pub fn kernel(&self) -> &Rc<KnowledgeKernel> {
        &self.kernel
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn starting_depth(&self) -> usize {
        self.starting_depth
    }

    /// Replaces the current targets, discarding any search in progress.
    pub fn set_targets(&mut self, targets: &StatementArray) {
        assert!(!targets.is_empty(), "a solver needs at least one target");
        self.clear();
        self.targets = Some(targets.clone());
        for target in targets.iter() {
            let root = self.kernel.begin_proof_of(target);
            let mut search = TargetSearch {
                root: root.clone(),
                stack: Vec::new(),
                depth_limit: self.starting_depth,
                cut_off: false,
                status: ProofCompletionState::Unfinished,
                proof: None,
                agg_time: 0.0,
                expansions: 1,
            };
            if self.kernel.is_trivial(root.forefront()) {
                search.status = ProofCompletionState::Proven;
                search.proof = Some(root);
                self.stats.increment(Counter::TargetsProven);
            } else {
                search.stack.push(self.open(root));
            }
            self.searches.push(search);
        }
    }

    pub fn targets(&self) -> Option<&StatementArray> {
        self.targets.as_ref()
    }

    /// Advances every unfinished target by up to `n` expansions.
    pub fn step(&mut self, n: usize) {
        assert!(self.engaged(), "step() without targets");
        assert!(n > 0, "step() needs a positive count");
        self.stats.increment(Counter::Steps);
        for idx in 0..self.searches.len() {
            let mut watch = Stopwatch::new();
            watch.start();
            for _ in 0..n {
                if self.searches[idx].status != ProofCompletionState::Unfinished {
                    break;
                }
                self.step_target(idx);
            }
            self.searches[idx].agg_time += watch.stop().as_secs_f32();
        }
    }

    fn open(&mut self, state: Rc<ProofState>) -> Frame {
        self.stats.increment(Counter::StatesOpened);
        let iter = self.iter_mgr.begin_iteration_of(&state);
        Frame { state, iter }
    }

    fn step_target(&mut self, idx: usize) {
        let search = &mut self.searches[idx];
        let Some(frame) = search.stack.last_mut() else {
            self.finish_pass(idx);
            return;
        };
        if !frame.iter.valid() {
            search.stack.pop();
            return;
        }
        let child = frame.iter.get();
        frame.iter.advance();

        self.stats.increment(Counter::Expansions);
        self.searches[idx].expansions += 1;
        if self.kernel.is_trivial(child.forefront()) {
            info!(target_idx = idx, depth = child.depth(), "proof found");
            self.stats.increment(Counter::TargetsProven);
            let search = &mut self.searches[idx];
            search.status = ProofCompletionState::Proven;
            search.proof = Some(child);
            search.stack.clear();
        } else if child.depth() < self.searches[idx].depth_limit {
            let frame = self.open(child);
            self.searches[idx].stack.push(frame);
        } else {
            self.searches[idx].cut_off = true;
        }
    }

    /// The tree below the current limit is exhausted.
    fn finish_pass(&mut self, idx: usize) {
        let search = &mut self.searches[idx];
        if search.cut_off && search.depth_limit < self.max_depth {
            search.depth_limit += 1;
            search.cut_off = false;
            debug!(target_idx = idx, depth_limit = search.depth_limit, "raising depth limit");
            self.stats.increment(Counter::DepthIncreases);
            let root = search.root.clone();
            let frame = self.open(root);
            self.searches[idx].stack.push(frame);
        } else {
            info!(target_idx = idx, depth_limit = search.depth_limit, "search exhausted without a proof");
            search.status = ProofCompletionState::NoProof;
            self.stats.increment(Counter::TargetsFailed);
        }
    }

    pub fn engaged(&self) -> bool {
        !self.searches.is_empty()
    }

    /// Completion of each target, in target order.
    pub fn states(&self) -> Vec<ProofCompletionState> {
        self.searches.iter().map(|s| s.status).collect()
    }

    /// The proven proof state of each target, if found.  Its path is the
    /// proof.
    pub fn proofs(&self) -> Vec<Option<Rc<ProofState>>> {
        self.searches.iter().map(|s| s.proof.clone()).collect()
    }

    pub fn any_proof_not_done(&self) -> bool {
        self.searches
            .iter()
            .any(|s| s.status == ProofCompletionState::Unfinished)
    }

    /// Seconds spent in `step` per target.
    pub fn agg_time(&self) -> Vec<f32> {
        self.searches.iter().map(|s| s.agg_time).collect()
    }

    /// Largest stack each target may build, which is its depth limit.
    pub fn max_mem(&self) -> Vec<usize> {
        self.searches.iter().map(|s| s.depth_limit).collect()
    }

    /// Proof states produced per target, counting the root.
    pub fn num_expansions(&self) -> Vec<usize> {
        self.searches.iter().map(|s| s.expansions).collect()
    }

    /// Statements on the current search path of each target.
    pub fn current_depths(&self) -> Vec<usize> {
        self.searches
            .iter()
            .map(|s| s.stack.last().map_or(0, |f| f.state.depth()))
            .collect()
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    pub fn clear(&mut self) {
        self.targets = None;
        self.searches.clear();
    }
}
