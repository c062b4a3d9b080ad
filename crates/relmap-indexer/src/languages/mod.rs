//! Per-language AST adapters

pub mod python;

use std::path::Path;

use relmap_core::{Language, SourceFile};
use tree_sitter::Tree;

/// Turns a parsed tree into the facts the engine consumes. The tree is
/// known to be free of syntax errors when `extract` is called.
pub trait LanguageAdapter: Send + Sync {
    fn grammar(&self) -> tree_sitter::Language;

    fn extract(&self, path: &Path, tree: &Tree, source: &str) -> SourceFile;
}

static PYTHON: python::PythonAdapter = python::PythonAdapter;

/// Adapter for a language, if one exists.
pub fn adapter_for(language: Language) -> Option<&'static dyn LanguageAdapter> {
    match language {
        Language::Python => Some(&PYTHON),
        Language::Other => None,
    }
}
