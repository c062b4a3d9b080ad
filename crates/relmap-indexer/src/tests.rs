//! Unit tests for relmap-indexer

use crate::*;
use relmap_core::test_utils::{create_python_repo, create_repo_with_structure};
use relmap_core::{Exports, ImportKind, SourceFile};
use std::path::{Path, PathBuf};

fn file<'i>(index: &'i ProjectIndex, path: &Path) -> &'i SourceFile {
    &index.files[index.position(path).unwrap()]
}

#[test]
fn test_full_index_of_python_repo() {
    let repo = create_python_repo();
    let config = EngineConfig::default();
    let index = Coordinator::new(repo.path(), &config).run_full_index().unwrap();

    assert_eq!(index.files_scanned, 6);
    assert!(!index.files_truncated);
    assert_eq!(index.parse_failures, 0);

    let init = file(&index, Path::new("app/__init__.py"));
    assert_eq!(init.imports[0].kind, ImportKind::ReExport);
    assert!(init.exports.contains("Dog"));
    assert!(!init.exports.is_explicit());

    let shapes = file(&index, Path::new("app/shapes.py"));
    assert_eq!(
        shapes.exports,
        Exports::Explicit(["area".to_string()].into_iter().collect())
    );

    let main = file(&index, Path::new("app/main.py"));
    let kinds: Vec<ImportKind> = main.imports.iter().map(|i| i.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ImportKind::Direct,
            ImportKind::Direct,
            ImportKind::Aliased,
            ImportKind::Wildcard
        ]
    );
    assert!(main.main_guard.is_some());

    let helpers = file(&index, Path::new("app/util/helpers.py"));
    assert!(helpers.exports.contains("slugify"));
    assert!(!helpers.exports.contains("_private"));
    assert!(index.symbols.lookup("app/util/helpers.py:_private").is_some());
}

#[test]
fn test_explicit_file_list() {
    let repo = create_python_repo();
    let config = EngineConfig::default();
    let files = vec![PathBuf::from("app/main.py"), PathBuf::from("app/animals.py")];
    let index = Coordinator::new(repo.path(), &config)
        .explicit_files(&files)
        .run_full_index()
        .unwrap();
    assert_eq!(index.files_scanned, 2);
    assert_eq!(index.files[0].path, Path::new("app/animals.py"));
}

#[test]
fn test_custom_extensions_from_config() {
    let repo = create_repo_with_structure(&[
        ("relmap.toml", "source_extensions = [\"py\"]\n"),
        ("mod.py", ""),
        ("types.pyi", ""),
    ]);
    let config = EngineConfig::load_or_default(repo.path()).unwrap();
    let index = Coordinator::new(repo.path(), &config).run_full_index().unwrap();
    assert_eq!(index.files_scanned, 1);
}

#[test]
fn test_missing_root() {
    let config = EngineConfig::default();
    let result = Coordinator::new(Path::new("/no/such/root"), &config).run_full_index();
    assert!(matches!(result, Err(relmap_core::EngineError::NotFound { .. })));
}
