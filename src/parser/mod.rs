//! Front-end for equational statement text.
//!
//! Text is first parsed into untyped [`ParseNode`] trees by a hand-written
//! line grammar, then checked against a model context and numbered by
//! [`ptree_to_stree`].

mod syntax;
mod tree;

pub use syntax::{
    is_identifier_char, parse_statement_line, parse_statement_trees, ParseError,
    ParseNode,
};
pub use tree::{parse_statement, parse_statements, ptree_to_stree};
