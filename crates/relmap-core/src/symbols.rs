//! Symbol table for cross-file resolution

use crate::model::Symbol;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Symbol table mapping `path:name` keys to symbols. Thread-safe so the
/// parallel extraction stage can fill it concurrently.
pub struct SymbolTable {
    symbols: DashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            symbols: DashMap::new(),
        }
    }

    /// Insert a symbol. The first definition of a key wins.
    pub fn insert(&self, symbol: Symbol) {
        if let Entry::Vacant(slot) = self.symbols.entry(symbol.qualified_name()) {
            slot.insert(symbol);
        }
    }

    /// Look up a symbol by qualified name.
    pub fn lookup(&self, qualified_name: &str) -> Option<Symbol> {
        self.symbols.get(qualified_name).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
