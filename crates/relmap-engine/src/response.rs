//! Request and result types for the two entry points
//!
//! Tier-gated fields are `Option`s skipped when `None`, so a disabled
//! feature leaves no key behind in serialized output.

use std::path::PathBuf;

use relmap_core::{
    ArchitectureReport, CallEdge, CallNode, DependencyEdge, DependencyNode, ErrorKind, ErrorRecord,
    HotNode, Truncation,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default)]
pub struct DependencyRequest {
    pub root: PathBuf,
    /// Absolute, or relative to `root`.
    pub target_file: PathBuf,
    pub target_symbol: Option<String>,
    pub include_code: bool,
    pub include_diagram: bool,
    pub max_depth_override: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct CallGraphRequest {
    pub root: PathBuf,
    /// `path:Qualified.name`, or a bare (possibly dotted) function name.
    pub entry_point: Option<String>,
    pub depth_limit: Option<usize>,
    pub check_circular_imports: bool,
    pub include_diagram: bool,
}

/// Scan bookkeeping shared by both results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ScanSummary {
    pub files_scanned: usize,
    /// The file cap dropped candidates before parsing.
    pub files_truncated: bool,
    pub parse_failures: usize,
}

/// An import that did not resolve to a file inside the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedImport {
    /// `unresolved_import`, or `cycle_in_alias_chain` for a looping alias.
    pub kind: ErrorKind,
    pub file: String,
    pub module: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub line: u32,
    pub reason: String,
    /// Always the external sentinel.
    pub resolved_to: String,
    /// Resolution steps taken, for alias-chain cycles.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<String>,
}

/// The concrete names one `from module import *` expanded to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WildcardExpansion {
    pub file: String,
    pub module: String,
    pub names: Vec<String>,
    /// Whether the names came from `__all__`.
    pub explicit: bool,
}

/// A call site left without an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedCall {
    pub kind: ErrorKind,
    pub caller: String,
    pub callee: String,
    pub line: u32,
    pub reason: String,
    pub resolved_to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyGraphResult {
    pub success: bool,
    pub target_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_symbol: Option<String>,
    pub nodes: Vec<DependencyNode>,
    pub edges: Vec<DependencyEdge>,
    pub cycles: Vec<Vec<String>>,
    pub unresolved_imports: Vec<UnresolvedImport>,
    /// Any limit (depth, file budget, node or edge cap) cut the graph.
    pub truncated: bool,
    #[serde(flatten)]
    pub truncation: Truncation,
    pub max_depth: Option<usize>,
    #[serde(flatten)]
    pub scan: ScanSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupling_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wildcard_expansions: Option<Vec<WildcardExpansion>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hot_nodes: Option<Vec<HotNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dead_code_candidates: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<ArchitectureReport>,
    pub timed_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallGraphResult {
    pub success: bool,
    pub nodes: Vec<CallNode>,
    pub edges: Vec<CallEdge>,
    pub entry_points: Vec<String>,
    /// Direct and mutual recursion.
    pub cycles: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circular_imports: Option<Vec<Vec<String>>>,
    pub unresolved_calls: Vec<UnresolvedCall>,
    pub truncated: bool,
    #[serde(flatten)]
    pub truncation: Truncation,
    pub depth_limit: Option<usize>,
    #[serde(flatten)]
    pub scan: ScanSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hot_nodes: Option<Vec<HotNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dead_code_candidates: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<ArchitectureReport>,
    pub timed_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
}
