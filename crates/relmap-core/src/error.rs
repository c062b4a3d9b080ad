//! Error types shared by every stage of a request

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{what} not found: {path}")]
    NotFound { what: &'static str, path: String },

    #[error("failed to parse {path}: {message}")]
    ParseFailure { path: String, message: String },

    #[error("unresolved import `{module}` in {file}")]
    UnresolvedImport { file: String, module: String },

    #[error("alias chain cycles in {file}: {}", chain.join(" -> "))]
    CycleInAliasChain { file: String, chain: Vec<String> },

    /// `what` names the limit for display, e.g. "Node" for `max_nodes`.
    #[error("{what} limit reached ({limit}={value})")]
    LimitExceeded {
        what: &'static str,
        limit: &'static str,
        value: usize,
    },

    #[error("time budget exceeded during {stage} after {elapsed_ms}ms")]
    Timeout { stage: &'static str, elapsed_ms: u128 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Serialisable discriminant of [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    ParseFailure,
    UnresolvedImport,
    CycleInAliasChain,
    LimitExceeded,
    Timeout,
    Config,
    Io,
    Internal,
}

/// Structured form of an error, embedded in responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
}

impl EngineError {
    pub fn not_found(what: &'static str, path: impl Into<String>) -> Self {
        EngineError::NotFound {
            what,
            path: path.into(),
        }
    }

    pub fn limit(what: &'static str, limit: &'static str, value: usize) -> Self {
        EngineError::LimitExceeded { what, limit, value }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::ParseFailure { .. } => ErrorKind::ParseFailure,
            EngineError::UnresolvedImport { .. } => ErrorKind::UnresolvedImport,
            EngineError::CycleInAliasChain { .. } => ErrorKind::CycleInAliasChain,
            EngineError::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            EngineError::Timeout { .. } => ErrorKind::Timeout,
            EngineError::Config(_) => ErrorKind::Config,
            EngineError::Io(_) => ErrorKind::Io,
            EngineError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn to_record(&self) -> ErrorRecord {
        let mut context = BTreeMap::new();
        match self {
            EngineError::NotFound { what, path } => {
                context.insert("what".to_string(), what.to_string());
                context.insert("path".to_string(), path.clone());
            }
            EngineError::ParseFailure { path, .. } => {
                context.insert("path".to_string(), path.clone());
            }
            EngineError::UnresolvedImport { file, module } => {
                context.insert("file".to_string(), file.clone());
                context.insert("module".to_string(), module.clone());
            }
            EngineError::CycleInAliasChain { file, chain } => {
                context.insert("file".to_string(), file.clone());
                context.insert("chain".to_string(), chain.join(" -> "));
            }
            EngineError::LimitExceeded { limit, value, .. } => {
                context.insert("limit".to_string(), limit.to_string());
                context.insert("value".to_string(), value.to_string());
            }
            EngineError::Timeout { stage, elapsed_ms } => {
                context.insert("stage".to_string(), stage.to_string());
                context.insert("elapsed_ms".to_string(), elapsed_ms.to_string());
            }
            EngineError::Config(_) | EngineError::Io(_) | EngineError::Internal(_) => {}
        }
        ErrorRecord {
            kind: self.kind(),
            message: self.to_string(),
            context,
        }
    }
}
