//! Rewriting machinery: the knowledge kernel, rule matching, proof states
//! and the layered successor iterators.
//!
//! Expanding a proof state nests four lazy layers, outermost first:
//! sub-expression positions of the forefront, active rules, distinct match
//! results, and assignments of the rule variables a match left unbound.
//! The no-repeat filter optionally wraps the outermost layer.

mod assignment_iter;
mod kernel;
mod match_results_iter;
mod matching;
mod no_repeat_iter;
mod proof_state;
mod random;
mod rule_iter;
mod sub_expr_iter;
mod succ_iter;

pub use assignment_iter::FreeVarAssignmentIter;
pub use kernel::{KernelSettings, KnowledgeKernel};
pub use match_results_iter::MatchResultsIter;
pub use matching::{
    assignment_candidates, match_rule, matches_somewhere, theorem_used, Candidate,
    MatchResult,
};
pub use no_repeat_iter::NoRepeatIter;
pub use proof_state::{ProofCompletionState, ProofState};
pub use random::{shuffle, Lcg};
pub use rule_iter::RuleMatchingIter;
pub use sub_expr_iter::SubExprMatchingIter;
pub use succ_iter::{EmptySuccIter, SuccIterPtr, SuccessorIter, Successors};
