use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier for a symbol registered in a symbol table.
///
/// Ids are handed out by a monotonic counter in definition order, so two
/// distinct names can never share an id.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SymbolId(usize);

impl SymbolId {
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> usize {
        self.0
    }
}

/// Kinds of user-defined symbols.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Constant,
    Function,
}

impl SymbolKind {
    pub const fn for_arity(arity: usize) -> Self {
        if arity == 0 {
            SymbolKind::Constant
        } else {
            SymbolKind::Function
        }
    }
}

/// Metadata recorded for each symbol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub arity: usize,
    pub kind: SymbolKind,
}

impl Symbol {
    pub fn new(id: SymbolId, name: impl Into<String>, arity: usize) -> Self {
        Self {
            id,
            name: name.into(),
            arity,
            kind: SymbolKind::for_arity(arity),
        }
    }
}

/// Interning table mapping names to ids and ids to arities.
///
/// Constants and functions are additionally kept in two partitioned lists in
/// the order they were defined, which is the order candidate constants are
/// enumerated in during free variable assignment.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_name: HashMap<String, SymbolId>,
    constants: Vec<SymbolId>,
    functions: Vec<SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` with the given arity.  Returns `None` if the name is
    /// already taken.
    pub fn define(&mut self, name: impl AsRef<str>, arity: usize) -> Option<SymbolId> {
        let name = name.as_ref();
        if self.by_name.contains_key(name) {
            return None;
        }

        let id = SymbolId(self.symbols.len());
        let symbol = Symbol::new(id, name, arity);
        match symbol.kind {
            SymbolKind::Constant => self.constants.push(id),
            SymbolKind::Function => self.functions.push(id),
        }
        self.by_name.insert(name.to_string(), id);
        self.symbols.push(symbol);
        Some(id)
    }

    pub fn id_of(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.0)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn contains_id(&self, id: SymbolId) -> bool {
        id.0 < self.symbols.len()
    }

    /// Name of a registered symbol.
    ///
    /// # Panics
    /// Panics if `id` was not produced by this table.
    pub fn name(&self, id: SymbolId) -> &str {
        &self.symbols[id.0].name
    }

    /// Arity of a registered symbol.
    ///
    /// # Panics
    /// Panics if `id` was not produced by this table.
    pub fn arity(&self, id: SymbolId) -> usize {
        self.symbols[id.0].arity
    }

    pub fn constant_ids(&self) -> &[SymbolId] {
        &self.constants
    }

    pub fn function_ids(&self) -> &[SymbolId] {
        &self.functions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Symbol> {
        self.symbols.iter()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{SymbolKind, SymbolTable};

    #[test]
    fn definitions_assign_monotonic_ids() {
        let mut table = SymbolTable::new();
        let e = table.define("e", 0).expect("fresh name");
        let mul = table.define("*", 2).expect("fresh name");
        assert!(e.as_raw() < mul.as_raw());
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(mul).map(|s| s.kind), Some(SymbolKind::Function));
    }

    #[test]
    fn redefinition_is_rejected() {
        let mut table = SymbolTable::new();
        assert!(table.define("i", 1).is_some());
        assert!(table.define("i", 2).is_none(), "names are unique");
        assert_eq!(table.arity(table.id_of("i").expect("defined")), 1);
    }

    #[test]
    fn constants_and_functions_are_partitioned() {
        let mut table = SymbolTable::new();
        let a = table.define("a", 0).expect("fresh");
        let f = table.define("f", 1).expect("fresh");
        let b = table.define("b", 0).expect("fresh");
        assert_eq!(table.constant_ids(), &[a, b]);
        assert_eq!(table.function_ids(), &[f]);
    }
}
