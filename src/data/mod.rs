//! Representation of equational statements.
//!
//! Symbols live in a [`ModelContext`]; expressions are flat copy-on-write
//! [`ExprTreeFlyweight`]s bound to that context, and a [`Statement`] pairs
//! two of them.

pub mod context;
pub mod expression;
pub mod flyweight;
pub mod free_vars;
pub mod node;
pub mod statement;
pub mod statement_array;
pub mod symbol;

pub use context::{ContextError, ModelContext, ModelContextBuilder};
pub use expression::{ExprPosition, Expression, SubExprIter};
pub use flyweight::{ArchiveError, ExprTreeFlyweight, NodeType, DEFAULT_MAX_ARITY};
pub use free_vars::{FreeVarIdSet, FreeVarMap};
pub use node::{SyntaxNode, SyntaxNodePtr};
pub use statement::{Side, Statement, StmtIter, StmtPosition};
pub use statement_array::StatementArray;
pub use symbol::{Symbol, SymbolId, SymbolKind, SymbolTable};
