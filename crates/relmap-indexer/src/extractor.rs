//! Symbol/import extraction on top of the language adapters: import kind
//! classification, public exports and the per-file symbol list

use std::collections::BTreeSet;

use relmap_core::{Exports, ImportKind, ImportStatement, SourceFile, Symbol, SymbolKind};

use crate::config::ExportHeuristic;

/// Complete the facts an adapter produced.
pub fn finalize(mut file: SourceFile, heuristic: ExportHeuristic) -> SourceFile {
    let package_init = file.is_package_init();
    for import in &mut file.imports {
        import.kind = classify(import, package_init);
    }

    if !file.exports.is_explicit() {
        file.exports = Exports::Heuristic(heuristic_exports(&file, heuristic));
    }

    file.symbols = build_symbols(&file);
    file
}

/// Wildcard and aliasing are syntactic and win; a `from` import inside a
/// package `__init__` re-publishes names; otherwise relative or direct.
fn classify(import: &ImportStatement, package_init: bool) -> ImportKind {
    if import.kind == ImportKind::Wildcard {
        return ImportKind::Wildcard;
    }
    if !import.alias_map().is_empty() {
        return ImportKind::Aliased;
    }
    if package_init && import.is_from_import() {
        return ImportKind::ReExport;
    }
    if import.module.is_relative() {
        return ImportKind::Relative;
    }
    ImportKind::Direct
}

/// Module-level bound names (definitions, assignments, import bindings)
/// accepted by the heuristic.
fn heuristic_exports(file: &SourceFile, heuristic: ExportHeuristic) -> BTreeSet<String> {
    let definitions = file
        .functions
        .iter()
        .filter(|f| f.class_name.is_none())
        .map(|f| f.name.clone())
        .chain(file.classes.iter().map(|c| c.name.clone()))
        .chain(file.variables.iter().cloned());
    let bindings = file.imports.iter().flat_map(|i| i.bound_names());

    definitions
        .chain(bindings)
        .filter(|name| name != "__all__" && heuristic.is_public(name))
        .collect()
}

fn build_symbols(file: &SourceFile) -> Vec<Symbol> {
    let mut symbols = Vec::new();
    for class in &file.classes {
        symbols.push(Symbol {
            name: class.name.clone(),
            file: file.path.clone(),
            kind: SymbolKind::Class,
            line: class.line,
            end_line: class.end_line,
        });
    }
    for function in &file.functions {
        symbols.push(Symbol {
            name: function.local_name(),
            file: file.path.clone(),
            kind: if function.class_name.is_some() {
                SymbolKind::Method
            } else {
                SymbolKind::Function
            },
            line: function.line,
            end_line: function.end_line,
        });
    }
    for variable in &file.variables {
        symbols.push(Symbol {
            name: variable.clone(),
            file: file.path.clone(),
            kind: SymbolKind::Variable,
            line: 0,
            end_line: 0,
        });
    }
    symbols.sort_by(|a, b| (a.line, &a.name).cmp(&(b.line, &b.name)));
    // Redefinitions keep the first occurrence
    let mut seen = BTreeSet::new();
    symbols.retain(|s| seen.insert(s.name.clone()));
    symbols
}

#[cfg(test)]
mod tests {
    use super::*;
    use relmap_core::{ClassDef, FunctionDef, ImportedName, Language, ModuleSpec};

    fn import(module: &str, names: Vec<ImportedName>, kind: ImportKind) -> ImportStatement {
        ImportStatement {
            kind,
            module: ModuleSpec::parse(module),
            names,
            module_alias: None,
            line: 1,
        }
    }

    #[test]
    fn classification() {
        let mut init = SourceFile::empty("pkg/__init__.py", Language::Python);
        init.imports = vec![
            import(".animals", vec![ImportedName::plain("Dog")], ImportKind::Direct),
            import(".shapes", vec![], ImportKind::Wildcard),
            import(".util", vec![ImportedName::aliased("slugify", "slug")], ImportKind::Direct),
        ];
        let init = finalize(init, ExportHeuristic::NonUnderscore);
        let kinds: Vec<ImportKind> = init.imports.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![ImportKind::ReExport, ImportKind::Wildcard, ImportKind::Aliased]
        );

        let mut module = SourceFile::empty("pkg/mod.py", Language::Python);
        module.imports = vec![
            import("..core", vec![ImportedName::plain("Base")], ImportKind::Direct),
            import("os", vec![], ImportKind::Direct),
        ];
        let module = finalize(module, ExportHeuristic::NonUnderscore);
        assert_eq!(module.imports[0].kind, ImportKind::Relative);
        assert_eq!(module.imports[1].kind, ImportKind::Direct);
    }

    #[test]
    fn heuristic_exports_cover_all_bindings() {
        let mut file = SourceFile::empty("m.py", Language::Python);
        file.functions.push(FunctionDef {
            name: "area".to_string(),
            ..Default::default()
        });
        file.functions.push(FunctionDef {
            name: "_hidden".to_string(),
            ..Default::default()
        });
        file.functions.push(FunctionDef {
            name: "speak".to_string(),
            class_name: Some("Dog".to_string()),
            ..Default::default()
        });
        file.classes.push(ClassDef {
            name: "Dog".to_string(),
            ..Default::default()
        });
        file.variables.insert("PI".to_string());
        file.imports
            .push(import("app.util", vec![ImportedName::aliased("helpers", "h")], ImportKind::Direct));

        let file = finalize(file, ExportHeuristic::NonUnderscore);
        let names: Vec<&str> = file.exports.names().iter().map(String::as_str).collect();
        assert_eq!(names, vec!["Dog", "PI", "area", "h"]);

        let symbols: Vec<&str> = file.symbols.iter().map(|s| s.name.as_str()).collect();
        assert!(symbols.contains(&"Dog.speak"));
        assert!(symbols.contains(&"_hidden"));
    }

    #[test]
    fn explicit_exports_are_kept_verbatim() {
        let mut file = SourceFile::empty("m.py", Language::Python);
        file.exports = Exports::Explicit(["area".to_string()].into_iter().collect());
        file.variables.insert("PI".to_string());
        let file = finalize(file, ExportHeuristic::AllTopLevel);
        assert!(file.exports.is_explicit());
        assert!(!file.exports.contains("PI"));
    }
}
