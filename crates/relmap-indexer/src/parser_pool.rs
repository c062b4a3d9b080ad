//! Parallel parse + extract stage
//!
//! Tree-sitter parsers are neither `Send` nor `Sync`, so each rayon worker
//! owns one (`map_init`). Results come back in enumeration order.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use relmap_core::{Language, SourceFile, SymbolTable};
use tree_sitter::{Node, Parser};

use crate::config::EngineConfig;
use crate::extractor;
use crate::languages::adapter_for;

/// Parsed files for one request.
#[derive(Default)]
pub struct ParsedProject {
    /// One entry per enumerated file, in the same order.
    pub files: Vec<SourceFile>,
    pub symbols: SymbolTable,
    pub parse_failures: usize,
}

/// Parse and extract every file. Per-file failures produce degraded entries.
pub fn parse_files(root: &Path, files: &[PathBuf], config: &EngineConfig) -> ParsedProject {
    let symbols = SymbolTable::new();

    let parsed: Vec<SourceFile> = files
        .par_iter()
        .map_init(Parser::new, |parser, relative| {
            let file = parse_one(parser, root, relative, config);
            for symbol in &file.symbols {
                symbols.insert(symbol.clone());
            }
            file
        })
        .collect();

    let parse_failures = parsed.iter().filter(|f| f.is_degraded()).count();
    tracing::debug!(
        "Parsed {} files ({} failures, {} symbols)",
        parsed.len(),
        parse_failures,
        symbols.len()
    );

    ParsedProject {
        files: parsed,
        symbols,
        parse_failures,
    }
}

/// Parse one root-relative file.
pub fn parse_one(parser: &mut Parser, root: &Path, relative: &Path, config: &EngineConfig) -> SourceFile {
    let language = Language::from_path(relative);
    let Some(adapter) = adapter_for(language) else {
        return SourceFile::empty(relative, language);
    };

    let bytes = match std::fs::read(root.join(relative)) {
        Ok(bytes) => bytes,
        Err(e) => return degrade(relative, language, format!("read failed: {}", e)),
    };
    let source = match String::from_utf8(bytes) {
        Ok(source) => source,
        Err(e) => return degrade(relative, language, format!("invalid UTF-8: {}", e)),
    };

    if let Err(e) = parser.set_language(&adapter.grammar()) {
        return degrade(relative, language, format!("grammar unavailable: {}", e));
    }
    let Some(tree) = parser.parse(&source, None) else {
        return degrade(relative, language, "parser returned no tree".to_string());
    };

    let root_node = tree.root_node();
    if root_node.has_error() {
        let message = match first_error(root_node) {
            Some(node) => format!(
                "syntax error at line {}, column {}",
                node.start_position().row + 1,
                node.start_position().column + 1
            ),
            None => "syntax error".to_string(),
        };
        return degrade(relative, language, message);
    }

    let file = adapter.extract(relative, &tree, &source);
    extractor::finalize(file, config.export_heuristic)
}

fn degrade(path: &Path, language: Language, message: String) -> SourceFile {
    tracing::warn!("Degrading {}: {}", path.display(), message);
    SourceFile::degraded(path, language, message)
}

fn first_error(root: Node) -> Option<Node> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let mut children: Vec<Node> = node.children(&mut cursor).collect();
            children.reverse();
            stack.extend(children);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use relmap_core::test_utils::{create_python_repo, create_repo_with_structure};

    #[test]
    fn results_follow_input_order() {
        let repo = create_python_repo();
        let files = vec![
            PathBuf::from("app/shapes.py"),
            PathBuf::from("app/animals.py"),
            PathBuf::from("app/main.py"),
        ];
        let project = parse_files(repo.path(), &files, &EngineConfig::default());
        let paths: Vec<&Path> = project.files.iter().map(|f| f.path.as_path()).collect();
        assert_eq!(paths, files.iter().map(PathBuf::as_path).collect::<Vec<_>>());
        assert_eq!(project.parse_failures, 0);
        assert!(project.symbols.lookup("app/animals.py:Dog.speak").is_some());
        assert!(project.symbols.lookup("app/shapes.py:area").is_some());
    }

    #[test]
    fn syntax_errors_degrade_the_file() {
        let repo = create_repo_with_structure(&[
            ("good.py", "def ok():\n    pass\n"),
            ("bad.py", "def broken(:\n    pass\n"),
        ]);
        let files = vec![PathBuf::from("bad.py"), PathBuf::from("good.py")];
        let project = parse_files(repo.path(), &files, &EngineConfig::default());

        assert_eq!(project.parse_failures, 1);
        let bad = &project.files[0];
        assert!(bad.is_degraded());
        assert!(bad.parse_error.as_deref().unwrap_or("").starts_with("syntax error"));
        assert!(bad.symbols.is_empty());
        assert!(project.files[1].defines("ok"));
    }

    #[test]
    fn invalid_utf8_degrades() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("latin.py"), b"x = '\xff'\n").unwrap();
        let mut parser = Parser::new();
        let file = parse_one(&mut parser, dir.path(), Path::new("latin.py"), &EngineConfig::default());
        assert!(file.parse_error.as_deref().unwrap_or("").contains("UTF-8"));
    }
}
