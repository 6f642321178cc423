//! Shared, immutable arrays of statements.

use super::statement::Statement;
use std::ops::Index;
use std::rc::Rc;

/// Immutable statement array.  Clones share the underlying storage;
/// slicing and concatenation build new arrays.
#[derive(Clone, Debug, Default)]
pub struct StatementArray {
    items: Rc<Vec<Statement>>,
}

impl StatementArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn at(&self, idx: usize) -> &Statement {
        &self.items[idx]
    }

    pub fn get(&self, idx: usize) -> Option<&Statement> {
        self.items.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Statement> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Statement] {
        &self.items
    }

    /// Every `step`-th statement of `start..stop`; `stop` is clamped to the
    /// length of the array.
    pub fn slice(&self, start: usize, stop: usize, step: usize) -> StatementArray {
        assert!(step > 0, "slice step must be positive");
        let stop = stop.min(self.len());
        if start >= stop {
            return StatementArray::new();
        }
        self.items[start..stop].iter().step_by(step).cloned().collect()
    }

    pub fn concat(&self, other: &StatementArray) -> StatementArray {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        self.iter().chain(other.iter()).cloned().collect()
    }

    /// One statement per line.
    pub fn to_str(&self) -> String {
        self.iter().map(Statement::to_str).collect::<Vec<_>>().join("\n")
    }
}

impl Index<usize> for StatementArray {
    type Output = Statement;

    fn index(&self, idx: usize) -> &Statement {
        self.at(idx)
    }
}

impl From<Vec<Statement>> for StatementArray {
    fn from(items: Vec<Statement>) -> Self {
        Self { items: Rc::new(items) }
    }
}

impl FromIterator<Statement> for StatementArray {
    fn from_iter<I: IntoIterator<Item = Statement>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<'a> IntoIterator for &'a StatementArray {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::StatementArray;
    use crate::data::context::ModelContext;
    use crate::data::expression::Expression;
    use crate::data::statement::Statement;
    use std::rc::Rc;

    fn numbered(n: usize) -> StatementArray {
        let ctx = Rc::new(ModelContext::builder("empty").build().expect("context"));
        (0..n)
            .map(|id| Statement::new(Expression::free(ctx.clone(), id), Expression::free(ctx.clone(), id)))
            .collect()
    }

    #[test]
    fn slice_with_step_and_clamped_stop() {
        let stmts = numbered(6);
        let picked = stmts.slice(1, 100, 2);
        assert_eq!(picked.to_str(), "x1 = x1\nx3 = x3\nx5 = x5");
        assert!(stmts.slice(4, 2, 1).is_empty());
    }

    #[test]
    fn concat_keeps_order() {
        let a = numbered(2);
        let b = numbered(1);
        let joined = a.concat(&b);
        assert_eq!(joined.len(), 3);
        assert_eq!(joined[2].to_str(), "x0 = x0");
        assert_eq!(a.concat(&StatementArray::new()).len(), 2);
    }
}
