//! Equational logic theorem prover core.
//!
//! Statements are equalities between expressions over the symbols of a
//! [`ModelContext`].  A [`KnowledgeKernel`] holds the axioms and any extra
//! theorems as bidirectional rewrite rules, and a [`ProofState`] is a chain
//! of statements from a target to the statement currently being rewritten.
//! Successors of a proof state are produced lazily, one rewrite at a time,
//! and the search layer decides which of them to follow.

pub mod config;
pub mod data;
pub mod inference;
pub mod parser;
pub mod search;

pub use config::{Counter, SearchSettings, SettingsError, Statistics};
pub use data::{
    ArchiveError, ContextError, Expression, ExprTreeFlyweight, FreeVarIdSet, FreeVarMap,
    ModelContext, ModelContextBuilder, NodeType, Statement, StatementArray, SymbolId,
    SyntaxNode, DEFAULT_MAX_ARITY,
};
pub use inference::{
    KernelSettings, KnowledgeKernel, ProofCompletionState, ProofState, SuccIterPtr,
    SuccessorIter, Successors,
};
pub use parser::{parse_statement, parse_statements, ParseError};
pub use search::{
    BasicStoppingStrategy, EditDistanceHeuristic, FixedStoppingStrategy, Heuristic,
    IterativeDeepeningSolver, IteratorManager, StoppingIterator, StoppingStrategy,
};
