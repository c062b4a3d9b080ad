//! Source enumeration, parsing and symbol/import extraction

pub mod config;
pub mod coordinator;
pub mod enumerate;
pub mod extractor;
pub mod languages;
pub mod parser_pool;

#[cfg(test)]
mod tests;

pub use config::{
    ConfidencePolicy, EngineConfig, EntryPointPatterns, ExportHeuristic, load_architecture_config,
};
pub use coordinator::{Coordinator, ProjectIndex};
pub use enumerate::{Enumeration, SourceEnumerator};
pub use languages::{LanguageAdapter, adapter_for};
pub use parser_pool::{ParsedProject, parse_files};
