//! Line grammar for equational statements.
//!
//! ```text
//! statement  := expression '=' expression
//! expression := identifier [ '(' expression { ',' expression } ')' ]
//! ```
//!
//! One statement per line; `#` starts a comment that runs to the end of the
//! line, and blank lines are skipped.

use thiserror::Error;

/// Parser error information.  Line and column are zero based and printed
/// one based.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("parse error at {}:{}: {message}", .line + 1, .column + 1)]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self { line, column, message: message.into() }
    }

    pub(crate) fn on_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }
}

/// Untyped parse tree of one statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseNode {
    Equality(Box<ParseNode>, Box<ParseNode>),
    Identifier {
        name: String,
        args: Vec<ParseNode>,
        column: usize,
    },
}

impl ParseNode {
    pub fn identifier(name: impl Into<String>, args: Vec<ParseNode>) -> Self {
        ParseNode::Identifier { name: name.into(), args, column: 0 }
    }
}

// Arguments are detached onto a work list so deep trees drop in a loop.
impl Drop for ParseNode {
    fn drop(&mut self) {
        let ParseNode::Identifier { args, .. } = self else {
            return;
        };
        let mut pending = std::mem::take(args);
        while let Some(mut node) = pending.pop() {
            if let ParseNode::Identifier { args, .. } = &mut node {
                pending.append(args);
            }
        }
    }
}

/// An application whose closing parenthesis has not been read yet.
struct OpenCall {
    name: String,
    column: usize,
    args: Vec<ParseNode>,
}

/// Characters allowed in symbol and variable names.
pub fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(ch, '+' | '-' | '*' | '/' | '.' | '_' | '?' | '^' | '%' | '&')
}

/// Parse every statement line of `source` into parse trees.
pub fn parse_statement_trees(source: &str) -> Result<Vec<ParseNode>, ParseError> {
    let mut trees = Vec::new();
    for (line_idx, raw_line) in source.lines().enumerate() {
        let line = strip_comment(raw_line);
        if line.trim().is_empty() {
            continue;
        }
        let tree = parse_statement_line(line).map_err(|err| err.on_line(line_idx))?;
        trees.push(tree);
    }
    Ok(trees)
}

/// Parse a single statement with no surrounding comment handling.
pub fn parse_statement_line(line: &str) -> Result<ParseNode, ParseError> {
    let mut cursor = Cursor::new(line);
    let lhs = cursor.expression()?;
    cursor.expect('=')?;
    let rhs = cursor.expression()?;
    cursor.skip_whitespace();
    if let Some(ch) = cursor.peek() {
        return Err(cursor.error(format!("unexpected `{}` after statement", ch)));
    }
    Ok(ParseNode::Equality(Box::new(lhs), Box::new(rhs)))
}

fn strip_comment(line: &str) -> &str {
    if let Some(idx) = line.find('#') { &line[..idx] } else { line }
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
    /// Characters consumed so far.
    column: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0, column: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self, ch: char) {
        self.pos += ch.len_utf8();
        self.column += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.bump(ch);
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(0, self.column, message)
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.bump(expected);
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        if self.eat(expected) {
            return Ok(());
        }
        Err(match self.peek() {
            Some(found) => self.error(format!("expected `{}`, found `{}`", expected, found)),
            None => self.error(format!("expected `{}` before end of line", expected)),
        })
    }

    fn identifier(&mut self) -> Result<(String, usize), ParseError> {
        self.skip_whitespace();
        let column = self.column;
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if !is_identifier_char(ch) {
                break;
            }
            self.bump(ch);
        }
        if start == self.pos {
            return Err(match self.peek() {
                Some(found) => self.error(format!("expected identifier, found `{}`", found)),
                None => self.error("expected identifier before end of line"),
            });
        }
        Ok((self.text[start..self.pos].to_string(), column))
    }

    /// Reads one expression.  Applications still waiting for their `)`
    /// are kept on an explicit stack, so nesting depth is not limited by
    /// the call stack.
    fn expression(&mut self) -> Result<ParseNode, ParseError> {
        let mut open: Vec<OpenCall> = Vec::new();
        loop {
            let (name, column) = self.identifier()?;
            if self.eat('(') {
                open.push(OpenCall { name, column, args: Vec::new() });
                continue;
            }

            let mut node = ParseNode::Identifier { name, args: Vec::new(), column };
            loop {
                let Some(mut call) = open.pop() else {
                    return Ok(node);
                };
                call.args.push(node);
                if self.eat(',') {
                    open.push(call);
                    break;
                }
                self.expect(')')?;
                node = ParseNode::Identifier {
                    name: call.name,
                    args: call.args,
                    column: call.column,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_statement_line, parse_statement_trees, ParseNode};

    fn names(node: &ParseNode) -> String {
        match node {
            ParseNode::Equality(lhs, rhs) => format!("{} = {}", names(lhs), names(rhs)),
            ParseNode::Identifier { name, args, .. } if args.is_empty() => name.clone(),
            ParseNode::Identifier { name, args, .. } => {
                let args: Vec<_> = args.iter().map(names).collect();
                format!("{}({})", name, args.join(", "))
            }
        }
    }

    #[test]
    fn parses_nested_applications() {
        let tree = parse_statement_line("f(x, g( y ,z)) =h").expect("statement");
        assert_eq!(names(&tree), "f(x, g(y, z)) = h");
    }

    #[test]
    fn empty_input_gives_no_statements() {
        assert!(parse_statement_trees("").expect("empty ok").is_empty());
        assert!(parse_statement_trees("\n  # only a comment\n").expect("ok").is_empty());
    }

    #[test]
    fn comments_run_to_end_of_line() {
        let text = "f(x, y) = z # this is a comment! g(x, y) = z \nh(x, y) = z";
        let trees = parse_statement_trees(text).expect("statements");
        assert_eq!(trees.len(), 2);
    }

    #[test]
    fn special_characters_in_names() {
        let text = "*(a, b) = c \n +(a, b) = c \n .(a, b) = c \n%(a, b) = c \n f-(a, b) = c \n g*(x) = y \n/(a, b) = *(a, /(1, b))";
        assert_eq!(parse_statement_trees(text).expect("statements").len(), 7);
    }

    #[test]
    fn ill_formed_statements_are_rejected() {
        for bad in ["f(x,", "f(", "f()", "f(,x)", "x=", "=x", "f(x=y,z)", "f(x=g(x))", "f x,y", "x = y = z"] {
            assert!(parse_statement_line(bad).is_err(), "`{}` should not parse", bad);
        }
    }

    #[test]
    fn deep_nesting_parses_without_recursion() {
        let depth = 20_000;
        let line = format!("{}x{} = y", "f(".repeat(depth), ")".repeat(depth));
        let tree = parse_statement_line(&line).expect("deep statement");
        let ParseNode::Equality(lhs, _) = &tree else {
            panic!("expected an equality");
        };
        let mut levels = 0;
        let mut node = lhs.as_ref();
        while let ParseNode::Identifier { args, .. } = node {
            match args.first() {
                Some(arg) => node = arg,
                None => break,
            }
            levels += 1;
        }
        assert_eq!(levels, depth);

        let unclosed = format!("{}x{} = y", "f(".repeat(depth), ")".repeat(depth - 1));
        let err = parse_statement_line(&unclosed).expect_err("one `)` short");
        assert_eq!(err.column, 3 * depth + 1);
    }

    #[test]
    fn error_reports_line_and_column() {
        let err = parse_statement_trees("x = y\nf(x, = y").expect_err("bad second line");
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 5);
        assert_eq!(err.to_string(), "parse error at 2:6: expected identifier, found `=`");
    }
}
