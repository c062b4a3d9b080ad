//! Source enumeration: gitignore-aware, deterministic, capped

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use relmap_core::model::display_path;
use relmap_core::{EngineError, Result};

use crate::config::EngineConfig;

/// Files selected for one request, relative to the root, in lexicographic order.
#[derive(Debug, Clone, Default)]
pub struct Enumeration {
    pub files: Vec<PathBuf>,
    /// Candidates seen before the cap was applied.
    pub total_candidates: usize,
    /// Set when `max_files` dropped candidates.
    pub truncated: bool,
}

pub struct SourceEnumerator<'a> {
    root: &'a Path,
    config: &'a EngineConfig,
    ignore: GlobSet,
    max_files: Option<usize>,
}

impl<'a> SourceEnumerator<'a> {
    pub fn new(root: &'a Path, config: &'a EngineConfig) -> Result<Self> {
        if !root.is_dir() {
            return Err(EngineError::not_found("project root", root.display().to_string()));
        }
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.ignore_patterns {
            let glob = Glob::new(pattern)
                .map_err(|e| EngineError::Config(format!("invalid ignore pattern {:?}: {}", pattern, e)))?;
            builder.add(glob);
        }
        let ignore = builder
            .build()
            .map_err(|e| EngineError::Config(e.to_string()))?;
        Ok(SourceEnumerator {
            root,
            config,
            ignore,
            max_files: None,
        })
    }

    pub fn max_files(mut self, max_files: Option<usize>) -> Self {
        self.max_files = max_files;
        self
    }

    /// Walk the whole tree.
    pub fn walk(&self) -> Result<Enumeration> {
        let walker = WalkBuilder::new(self.root)
            .git_ignore(self.config.respect_gitignore)
            .git_global(self.config.respect_gitignore)
            .git_exclude(self.config.respect_gitignore)
            .require_git(false)
            .follow_links(false)
            .build();

        let mut candidates = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(self.root) else {
                continue;
            };
            if self.accepts(relative) {
                candidates.push(relative.to_path_buf());
            }
        }

        Ok(self.finish(candidates))
    }

    /// Restrict enumeration to an explicit list of root-relative paths.
    /// Missing or filtered entries are skipped.
    pub fn explicit(&self, files: &[PathBuf]) -> Result<Enumeration> {
        let candidates = files
            .iter()
            .filter(|p| self.root.join(p).is_file() && self.accepts(p))
            .cloned()
            .collect();
        Ok(self.finish(candidates))
    }

    fn accepts(&self, relative: &Path) -> bool {
        self.config.is_source_extension(relative) && !self.ignore.is_match(relative)
    }

    fn finish(&self, mut candidates: Vec<PathBuf>) -> Enumeration {
        candidates.sort_by_cached_key(|p| display_path(p));
        candidates.dedup();

        let total_candidates = candidates.len();
        let mut truncated = false;
        if let Some(cap) = self.max_files {
            if candidates.len() > cap {
                tracing::warn!(
                    "File limit reached (max_files={}): scanning {} of {} candidates",
                    cap,
                    cap,
                    total_candidates
                );
                candidates.truncate(cap);
                truncated = true;
            }
        }

        Enumeration {
            files: candidates,
            total_candidates,
            truncated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relmap_core::test_utils::create_repo_with_structure;

    fn names(e: &Enumeration) -> Vec<String> {
        e.files.iter().map(|p| display_path(p)).collect()
    }

    #[test]
    fn walks_in_lexicographic_order() {
        let repo = create_repo_with_structure(&[
            ("b.py", ""),
            ("a/z.py", ""),
            ("a/b.py", ""),
            ("README.md", "# readme"),
            ("stubs/c.pyi", ""),
        ]);
        let config = EngineConfig::default();
        let result = SourceEnumerator::new(repo.path(), &config).unwrap().walk().unwrap();
        assert_eq!(names(&result), vec!["a/b.py", "a/z.py", "b.py", "stubs/c.pyi"]);
        assert!(!result.truncated);
    }

    #[test]
    fn ignore_patterns_apply() {
        let repo = create_repo_with_structure(&[
            ("app/main.py", ""),
            ("app/__pycache__/main.py", ""),
            ("venv/lib/site.py", ""),
        ]);
        let config = EngineConfig::default();
        let result = SourceEnumerator::new(repo.path(), &config).unwrap().walk().unwrap();
        assert_eq!(names(&result), vec!["app/main.py"]);
    }

    #[test]
    fn cap_raises_truncation_flag() {
        let files: Vec<(String, &str)> = (0..5).map(|i| (format!("m{}.py", i), "")).collect();
        let structure: Vec<(&str, &str)> = files.iter().map(|(p, c)| (p.as_str(), *c)).collect();
        let repo = create_repo_with_structure(&structure);
        let config = EngineConfig::default();
        let result = SourceEnumerator::new(repo.path(), &config)
            .unwrap()
            .max_files(Some(3))
            .walk()
            .unwrap();
        assert_eq!(names(&result), vec!["m0.py", "m1.py", "m2.py"]);
        assert_eq!(result.total_candidates, 5);
        assert!(result.truncated);
    }

    #[test]
    fn explicit_list_is_filtered_and_sorted() {
        let repo = create_repo_with_structure(&[("b.py", ""), ("a.py", ""), ("notes.txt", "")]);
        let config = EngineConfig::default();
        let result = SourceEnumerator::new(repo.path(), &config)
            .unwrap()
            .explicit(&[
                PathBuf::from("b.py"),
                PathBuf::from("notes.txt"),
                PathBuf::from("missing.py"),
                PathBuf::from("a.py"),
            ])
            .unwrap();
        assert_eq!(names(&result), vec!["a.py", "b.py"]);
    }

    #[test]
    fn missing_root_is_not_found() {
        let config = EngineConfig::default();
        let err = SourceEnumerator::new(Path::new("/definitely/not/here"), &config).err();
        assert!(matches!(err, Some(EngineError::NotFound { .. })));
    }
}
