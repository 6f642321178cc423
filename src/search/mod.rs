//! Search over proof states: benefit heuristics, stopping strategies and
//! the iterative deepening solver that drives the successor iterators.

mod heuristic;
mod iter_manager;
mod solver;
mod stopping;
mod stopping_iter;

pub use heuristic::{EditDistanceHeuristic, Heuristic};
pub use iter_manager::IteratorManager;
pub use solver::{IterativeDeepeningSolver, DEFAULT_MAX_DEPTH, DEFAULT_STARTING_DEPTH};
pub use stopping::{
    BasicStoppingStrategy, FixedStoppingStrategy, StoppingStrategy, StoppingStrategyPtr,
};
pub use stopping_iter::{Stopwatch, StoppingIterator};
