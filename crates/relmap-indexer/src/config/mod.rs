//! Engine configuration (`relmap.toml`) and the architecture config loader

pub mod architecture;

use std::path::Path;

use relmap_core::{EngineError, Result};
use serde::{Deserialize, Serialize};

pub use architecture::load_architecture_config;

/// File names looked for at the project root, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["relmap.toml", ".relmap.toml"];

/// Which module-level names count as public when a module has no `__all__`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportHeuristic {
    /// Every module-level bound name not starting with `_`.
    #[default]
    NonUnderscore,
    /// Every module-level bound name.
    AllTopLevel,
}

impl ExportHeuristic {
    pub fn is_public(&self, name: &str) -> bool {
        match self {
            ExportHeuristic::NonUnderscore => !name.starts_with('_'),
            ExportHeuristic::AllTopLevel => true,
        }
    }
}

/// Confidence assigned to a dependency edge at a given hop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidencePolicy {
    pub base: f64,
    pub decay: f64,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        ConfidencePolicy {
            base: 1.0,
            decay: 0.9,
        }
    }
}

impl ConfidencePolicy {
    /// `base × decay^hop`
    pub fn at(&self, hop: u32) -> f64 {
        self.base * self.decay.powi(hop as i32)
    }
}

/// Extra decorator patterns (regular expressions over the dotted decorator
/// name) added to the built-in entry point conventions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryPointPatterns {
    pub cli: Vec<String>,
    pub web: Vec<String>,
    pub test: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub source_extensions: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub respect_gitignore: bool,
    pub export_heuristic: ExportHeuristic,
    pub confidence: ConfidencePolicy,
    /// Globs delimiting modules for the coupling score. Empty means each
    /// top-level package is its own module.
    pub module_boundaries: Vec<String>,
    pub entry_points: EntryPointPatterns,
    pub timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            source_extensions: vec!["py".to_string(), "pyi".to_string()],
            ignore_patterns: [
                ".git/**",
                "**/__pycache__/**",
                "**/.venv/**",
                "**/venv/**",
                "**/node_modules/**",
                "**/build/**",
                "**/dist/**",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            respect_gitignore: true,
            export_heuristic: ExportHeuristic::default(),
            confidence: ConfidencePolicy::default(),
            module_boundaries: Vec::new(),
            entry_points: EntryPointPatterns::default(),
            timeout_ms: None,
        }
    }
}

impl EngineConfig {
    /// Load `relmap.toml` (or `.relmap.toml`) from the project root, falling
    /// back to defaults when neither exists.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        for name in CONFIG_FILE_NAMES {
            let path = root.join(name);
            if path.is_file() {
                tracing::debug!("Loading engine config from {}", path.display());
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(content).map_err(|e| EngineError::Config(e.to_string()))?;
        if !(0.0..=1.0).contains(&config.confidence.base)
            || !(0.0..=1.0).contains(&config.confidence.decay)
        {
            return Err(EngineError::Config(
                "confidence base and decay must lie in [0, 1]".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn is_source_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.source_extensions.iter().any(|s| s == ext))
    }
}
