//! The model context: which symbols exist, their arities, and the axioms.
//!
//! A context is assembled once through [`ModelContextBuilder`] (directly or
//! from a JSON definitions file) and is read-only afterwards.

use super::flyweight::DEFAULT_MAX_ARITY;
use super::symbol::{SymbolId, SymbolTable};
use crate::parser::is_identifier_char;
use serde::Deserialize;
use std::fs;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Failures while building a model context.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("failed to read model context: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid model context file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("symbol `{0}` is defined more than once")]
    Redefinition(String),
    #[error("`{0}` is not a valid symbol name")]
    InvalidName(String),
    #[error("symbol `{name}` has arity {arity}, above the limit of {max}")]
    ArityTooLarge { name: String, arity: usize, max: usize },
    #[error("the maximum arity must be positive")]
    ZeroMaxArity,
}

/// Immutable symbol table plus the axiom strings of a theory.
#[derive(Clone, Debug)]
pub struct ModelContext {
    name: String,
    max_arity: usize,
    symbols: SymbolTable,
    axioms: Vec<String>,
}

impl ModelContext {
    pub fn builder(name: impl Into<String>) -> ModelContextBuilder {
        ModelContextBuilder::new(name)
    }

    /// Parse a definitions document of the form
    /// `{"name": .., "max_arity": .., "definitions": [{"name": .., "arity": ..}], "axioms": [..]}`.
    pub fn from_json_str(text: &str) -> Result<Self, ContextError> {
        let file: ContextFile = serde_json::from_str(text)?;
        file.into_context()
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ContextError> {
        let file: ContextFile = serde_json::from_reader(reader)?;
        file.into_context()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ContextError> {
        let text = fs::read_to_string(path.as_ref())?;
        let ctx = Self::from_json_str(&text)?;
        tracing::info!(
            path = %path.as_ref().display(),
            name = %ctx.name,
            symbols = ctx.symbols.len(),
            axioms = ctx.axioms.len(),
            "model context loaded"
        );
        Ok(ctx)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn max_arity(&self) -> usize {
        self.max_arity
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn symbol_id(&self, name: &str) -> Option<SymbolId> {
        self.symbols.id_of(name.trim())
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.symbols.is_defined(name.trim())
    }

    pub fn symbol_name(&self, id: SymbolId) -> &str {
        self.symbols.name(id)
    }

    pub fn symbol_arity(&self, id: SymbolId) -> usize {
        self.symbols.arity(id)
    }

    /// Constant ids in definition order.
    pub fn constant_ids(&self) -> &[SymbolId] {
        self.symbols.constant_ids()
    }

    /// Function ids in definition order.
    pub fn function_ids(&self) -> &[SymbolId] {
        self.symbols.function_ids()
    }

    pub fn axioms(&self) -> &[String] {
        &self.axioms
    }

    /// Copy of this context with one more symbol.  Ids of the existing
    /// symbols are unchanged.
    pub fn with_symbol(&self, name: &str, arity: usize) -> Result<ModelContext, ContextError> {
        let builder = ModelContextBuilder {
            name: self.name.clone(),
            max_arity: self.max_arity,
            symbols: self.symbols.clone(),
            axioms: self.axioms.clone(),
        };
        builder.define(name, arity)?.build()
    }

    /// Whether every symbol of `base` is defined here under the same id
    /// and arity, so expressions over `base` read the same in `self`.
    pub fn extends(&self, base: &ModelContext) -> bool {
        self.name == base.name
            && self.max_arity == base.max_arity
            && base.symbols.len() <= self.symbols.len()
            && base
                .symbols
                .iter()
                .zip(self.symbols.iter())
                .all(|(old, new)| old.name == new.name && old.arity == new.arity)
    }
}

/// Incremental construction of a [`ModelContext`].
#[derive(Clone, Debug)]
pub struct ModelContextBuilder {
    name: String,
    max_arity: usize,
    symbols: SymbolTable,
    axioms: Vec<String>,
}

impl ModelContextBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_arity: DEFAULT_MAX_ARITY,
            symbols: SymbolTable::new(),
            axioms: Vec::new(),
        }
    }

    pub fn max_arity(mut self, max_arity: usize) -> Self {
        self.max_arity = max_arity;
        self
    }

    /// Define a symbol; names are trimmed before registration.
    pub fn define(mut self, name: &str, arity: usize) -> Result<Self, ContextError> {
        let name = name.trim();
        if name.is_empty() || !name.chars().all(is_identifier_char) {
            return Err(ContextError::InvalidName(name.to_string()));
        }
        if self.symbols.define(name, arity).is_none() {
            return Err(ContextError::Redefinition(name.to_string()));
        }
        Ok(self)
    }

    pub fn axiom(mut self, text: impl Into<String>) -> Self {
        self.axioms.push(text.into());
        self
    }

    pub fn build(self) -> Result<ModelContext, ContextError> {
        if self.max_arity == 0 {
            return Err(ContextError::ZeroMaxArity);
        }
        if let Some(symbol) = self.symbols.iter().find(|s| s.arity > self.max_arity) {
            return Err(ContextError::ArityTooLarge {
                name: symbol.name.clone(),
                arity: symbol.arity,
                max: self.max_arity,
            });
        }
        Ok(ModelContext {
            name: self.name,
            max_arity: self.max_arity,
            symbols: self.symbols,
            axioms: self.axioms,
        })
    }
}

#[derive(Deserialize)]
struct ContextFile {
    #[serde(default)]
    name: String,
    #[serde(default = "default_max_arity")]
    max_arity: usize,
    #[serde(default)]
    definitions: Vec<DefinitionEntry>,
    #[serde(default)]
    axioms: Vec<String>,
}

#[derive(Deserialize)]
struct DefinitionEntry {
    name: String,
    arity: usize,
}

fn default_max_arity() -> usize {
    DEFAULT_MAX_ARITY
}

impl ContextFile {
    fn into_context(self) -> Result<ModelContext, ContextError> {
        let mut builder = ModelContextBuilder::new(self.name).max_arity(self.max_arity);
        for def in &self.definitions {
            builder = builder.define(&def.name, def.arity)?;
        }
        for axiom in self.axioms {
            builder = builder.axiom(axiom);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::{ContextError, ModelContext};

    const GROUP: &str = r#"{
        "name": "group theory",
        "definitions": [
            {"name": "e", "arity": 0},
            {"name": " i ", "arity": 1},
            {"name": "*", "arity": 2}
        ],
        "axioms": ["*(e, x) = x"]
    }"#;

    #[test]
    fn load_from_json() {
        let ctx = ModelContext::from_json_str(GROUP).expect("valid context");
        assert_eq!(ctx.name(), "group theory");
        assert_eq!(ctx.max_arity(), 5);
        assert!(ctx.is_defined("i"), "names are trimmed");
        let mul = ctx.symbol_id("*").expect("defined");
        assert_eq!(ctx.symbol_arity(mul), 2);
        assert_eq!(ctx.symbol_name(mul), "*");
        assert_eq!(ctx.constant_ids().len(), 1);
        assert_eq!(ctx.function_ids().len(), 2);
        assert_eq!(ctx.axioms(), &["*(e, x) = x".to_string()]);
    }

    #[test]
    fn redefinition_fails() {
        let text = r#"{"definitions": [{"name": "e", "arity": 0}, {"name": "e", "arity": 1}]}"#;
        assert!(matches!(
            ModelContext::from_json_str(text),
            Err(ContextError::Redefinition(name)) if name == "e"
        ));
    }

    #[test]
    fn arity_limit_is_configurable() {
        let text = r#"{"max_arity": 2, "definitions": [{"name": "f", "arity": 3}]}"#;
        assert!(matches!(
            ModelContext::from_json_str(text),
            Err(ContextError::ArityTooLarge { arity: 3, max: 2, .. })
        ));
        let wide = r#"{"max_arity": 7, "definitions": [{"name": "f", "arity": 7}]}"#;
        assert!(ModelContext::from_json_str(wide).is_ok());
    }

    #[test]
    fn malformed_json_and_names_fail() {
        assert!(matches!(
            ModelContext::from_json_str("{ not json"),
            Err(ContextError::Json(_))
        ));
        let text = r#"{"definitions": [{"name": "a b", "arity": 0}]}"#;
        assert!(matches!(
            ModelContext::from_json_str(text),
            Err(ContextError::InvalidName(_))
        ));
    }

    #[test]
    fn extension_keeps_existing_ids() {
        let base = ModelContext::from_json_str(GROUP).expect("valid context");
        let wider = base.with_symbol("c", 0).expect("fresh name");
        assert!(wider.extends(&base));
        assert!(!base.extends(&wider));
        assert_eq!(wider.symbol_id("*"), base.symbol_id("*"));
        assert_eq!(wider.constant_ids().len(), 2);
        assert!(matches!(base.with_symbol("e", 1), Err(ContextError::Redefinition(_))));
        assert!(matches!(
            base.with_symbol("g", 6),
            Err(ContextError::ArityTooLarge { arity: 6, max: 5, .. })
        ));
    }
}
