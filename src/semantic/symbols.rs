//! Symbols and the flat symbol table
//!
//! Every [`Symbol`] lives in one arena, the [`SymbolTable`], in creation
//! order. Scopes and the code generator refer to symbols by [`SymbolId`], so a
//! mutation is made once and seen everywhere.

use super::types::PrimType;
use std::fmt;

/// Stable identity of a symbol: its index in the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Array,
    Parameter,
    Function,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SymbolKind::Variable => "variable",
            SymbolKind::Array => "array",
            SymbolKind::Parameter => "parameter",
            SymbolKind::Function => "function",
        };
        write!(f, "{}", name)
    }
}

/// Where a symbol was declared: at global level or inside a named function
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolScope {
    Global,
    Function(String),
}

impl fmt::Display for SymbolScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolScope::Global => write!(f, "global"),
            SymbolScope::Function(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub ty: PrimType,
    pub kind: SymbolKind,
    pub scope: SymbolScope,
    pub used: bool,
    pub initialized: bool,
    pub array_length: Option<usize>,
    /// Source offset of the declaring identifier
    pub offset: usize,
    /// Parameter symbols, in order, when `kind` is `Function`
    pub parameters: Vec<SymbolId>,
}

impl Symbol {
    /// Number of storage cells the symbol occupies
    pub fn cells(&self) -> usize {
        match self.kind {
            SymbolKind::Array => self.array_length.filter(|&n| n > 0).unwrap_or(1),
            _ => 1,
        }
    }
}

/// Append-only arena of every symbol created during one analysis
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        name: &str,
        ty: PrimType,
        kind: SymbolKind,
        scope: SymbolScope,
        offset: usize,
    ) -> SymbolId {
        let id = SymbolId(self.symbols.len());
        self.symbols.push(Symbol {
            id,
            name: name.to_string(),
            ty,
            kind,
            scope,
            used: false,
            initialized: false,
            array_length: None,
            offset,
            parameters: Vec::new(),
        });
        id
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

}

/// One lexical block
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub symbols: Vec<SymbolId>,
    pub function_body: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_follow_creation_order() {
        let mut table = SymbolTable::new();
        let a = table.insert("a", PrimType::Int, SymbolKind::Variable, SymbolScope::Global, 0);
        let b = table.insert("b", PrimType::Int, SymbolKind::Variable, SymbolScope::Global, 4);
        assert_eq!(a, SymbolId(0));
        assert_eq!(b, SymbolId(1));
        table.get_mut(a).used = true;
        assert!(table.get(a).used);
        assert!(!table.get(b).used);
        assert_eq!(table.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn test_cells() {
        let mut table = SymbolTable::new();
        let v = table.insert("v", PrimType::Int, SymbolKind::Array, SymbolScope::Global, 0);
        assert_eq!(table.get(v).cells(), 1);
        table.get_mut(v).array_length = Some(3);
        assert_eq!(table.get(v).cells(), 3);
    }
}
