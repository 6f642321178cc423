//! Typed conversion of parse trees into syntax trees and statements.

use super::syntax::{parse_statement_trees, ParseError, ParseNode};
use crate::data::context::ModelContext;
use crate::data::node::{SyntaxNode, SyntaxNodePtr};
use crate::data::statement::Statement;
use crate::data::statement_array::StatementArray;
use crate::data::symbol::SymbolId;
use std::collections::HashMap;
use std::rc::Rc;

/// Convert one statement parse tree.
///
/// Identifiers naming a context symbol become constants or functions and
/// must be applied to exactly `arity` arguments.  Any other identifier is a
/// free variable; free variables are numbered from zero in order of first
/// occurrence within the statement.
pub fn ptree_to_stree(ptree: &ParseNode, ctx: &ModelContext) -> Result<SyntaxNodePtr, ParseError> {
    let mut free_ids = HashMap::new();
    match ptree {
        ParseNode::Equality(lhs, rhs) => {
            let lhs = convert_expression(lhs, ctx, &mut free_ids)?;
            let rhs = convert_expression(rhs, ctx, &mut free_ids)?;
            Ok(SyntaxNode::equality(lhs, rhs))
        }
        _ => convert_expression(ptree, ctx, &mut free_ids),
    }
}

fn convert_expression(
    node: &ParseNode,
    ctx: &ModelContext,
    free_ids: &mut HashMap<String, usize>,
) -> Result<SyntaxNodePtr, ParseError> {
    enum Visit<'a> {
        Enter(&'a ParseNode),
        Apply(SymbolId, usize),
    }

    let mut stack = vec![Visit::Enter(node)];
    let mut results: Vec<SyntaxNodePtr> = Vec::new();
    while let Some(visit) = stack.pop() {
        let (name, args, column) = match visit {
            Visit::Apply(id, arity) => {
                let children = results.split_off(results.len() - arity);
                results.push(SyntaxNode::function(id, children));
                continue;
            }
            Visit::Enter(ParseNode::Identifier { name, args, column }) => (name, args, *column),
            Visit::Enter(ParseNode::Equality(..)) => {
                return Err(ParseError::new(0, 0, "equality inside an expression"));
            }
        };

        let Some(id) = ctx.symbol_id(name) else {
            if !args.is_empty() {
                return Err(ParseError::new(
                    0,
                    column,
                    format!("`{}` is applied to arguments but is not a defined function", name),
                ));
            }
            let next = free_ids.len();
            let id = *free_ids.entry(name.clone()).or_insert(next);
            results.push(SyntaxNode::free(id));
            continue;
        };

        let arity = ctx.symbol_arity(id);
        if arity != args.len() {
            return Err(ParseError::new(
                0,
                column,
                format!("`{}` expects {} argument(s), found {}", name, arity, args.len()),
            ));
        }
        if arity == 0 {
            results.push(SyntaxNode::constant(id));
            continue;
        }
        // Children are entered left to right so free variables are numbered
        // in order of first occurrence.
        stack.push(Visit::Apply(id, arity));
        stack.extend(args.iter().rev().map(Visit::Enter));
    }

    Ok(results.pop().expect("conversion produces one node"))
}

/// Parse and type check one statement per line of `source`.
pub fn parse_statements(ctx: &Rc<ModelContext>, source: &str) -> Result<StatementArray, ParseError> {
    let mut statements = Vec::new();
    let mut line_of = source
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let code = line.find('#').map_or(*line, |idx| &line[..idx]);
            !code.trim().is_empty()
        })
        .map(|(idx, _)| idx);

    for tree in parse_statement_trees(source)? {
        let line = line_of.next().unwrap_or(0);
        let stree = ptree_to_stree(&tree, ctx).map_err(|err| err.on_line(line))?;
        statements.push(Statement::from_syntax(ctx.clone(), &stree));
    }
    Ok(StatementArray::from(statements))
}

/// Parse exactly one statement.
pub fn parse_statement(ctx: &Rc<ModelContext>, text: &str) -> Result<Statement, ParseError> {
    let parsed = parse_statements(ctx, text)?;
    if parsed.len() != 1 {
        return Err(ParseError::new(0, 0, format!("expected one statement, found {}", parsed.len())));
    }
    Ok(parsed.at(0).clone())
}
