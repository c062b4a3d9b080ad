//! Module-boundary coupling score

use std::collections::BTreeSet;

use globset::{Glob, GlobMatcher};
use relmap_core::{DependencyEdge, EngineError, Result};

/// Maps files to the module they belong to for coupling purposes.
pub struct ModuleBoundaries {
    patterns: Vec<(String, GlobMatcher)>,
}

impl ModuleBoundaries {
    /// Compile boundary globs. An empty list makes every top-level directory
    /// its own module.
    pub fn compile(patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                let glob = Glob::new(p)
                    .map_err(|e| EngineError::Config(format!("invalid module boundary {:?}: {}", p, e)))?;
                Ok((p.clone(), glob.compile_matcher()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ModuleBoundaries { patterns })
    }

    /// The first matching boundary pattern, else the top-level path segment
    /// (empty for files at the root).
    pub fn module_of<'p>(&'p self, path: &'p str) -> &'p str {
        if let Some((pattern, _)) = self.patterns.iter().find(|(_, m)| m.is_match(path)) {
            return pattern;
        }
        match path.split_once('/') {
            Some((top, _)) => top,
            None => "",
        }
    }

    /// Fraction of `file`'s distinct internal dependencies that live in
    /// another module. 0.0 when the file has none.
    pub fn score(&self, file: &str, edges: &[DependencyEdge]) -> f64 {
        let targets: BTreeSet<&str> = edges
            .iter()
            .filter(|e| e.from == file && e.to != file)
            .map(|e| e.to.as_str())
            .collect();
        if targets.is_empty() {
            return 0.0;
        }
        let home = self.module_of(file);
        let crossing = targets.iter().filter(|t| self.module_of(t) != home).count();
        crossing as f64 / targets.len() as f64
    }
}
