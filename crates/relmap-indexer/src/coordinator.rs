//! Orchestrates enumeration and the parallel parse stage

use std::path::{Path, PathBuf};

use relmap_core::{Result, SourceFile, SymbolTable};

use crate::config::EngineConfig;
use crate::enumerate::SourceEnumerator;
use crate::parser_pool::parse_files;

/// Everything the graph builders need from one scan of a project.
pub struct ProjectIndex {
    pub files: Vec<SourceFile>,
    pub symbols: SymbolTable,
    pub files_scanned: usize,
    /// The enumerator dropped candidates to honor `max_files`.
    pub files_truncated: bool,
    pub total_candidates: usize,
    pub parse_failures: usize,
}

impl ProjectIndex {
    /// Index of the file at the root-relative `path`.
    pub fn position(&self, path: &Path) -> Option<usize> {
        self.files.iter().position(|f| f.path == path)
    }
}

pub struct Coordinator<'a> {
    root: &'a Path,
    config: &'a EngineConfig,
    max_files: Option<usize>,
    explicit: Option<&'a [PathBuf]>,
}

impl<'a> Coordinator<'a> {
    pub fn new(root: &'a Path, config: &'a EngineConfig) -> Self {
        Coordinator {
            root,
            config,
            max_files: None,
            explicit: None,
        }
    }

    pub fn max_files(mut self, max_files: Option<usize>) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn explicit_files(mut self, files: &'a [PathBuf]) -> Self {
        self.explicit = Some(files);
        self
    }

    pub fn run_full_index(&self) -> Result<ProjectIndex> {
        let enumerator = SourceEnumerator::new(self.root, self.config)?.max_files(self.max_files);
        let enumeration = match self.explicit {
            Some(files) => enumerator.explicit(files)?,
            None => enumerator.walk()?,
        };

        let parsed = parse_files(self.root, &enumeration.files, self.config);
        tracing::info!(
            "Indexed {} files under {} ({} parse failures{})",
            parsed.files.len(),
            self.root.display(),
            parsed.parse_failures,
            if enumeration.truncated { ", file cap reached" } else { "" }
        );

        Ok(ProjectIndex {
            files_scanned: parsed.files.len(),
            files_truncated: enumeration.truncated,
            total_candidates: enumeration.total_candidates,
            parse_failures: parsed.parse_failures,
            files: parsed.files,
            symbols: parsed.symbols,
        })
    }
}
