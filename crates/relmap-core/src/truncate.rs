//! Capability-driven trimming of node/edge sets

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::{EdgeView, NodeView};

/// Pre-truncation counts and what was cut.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Truncation {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub nodes_truncated: bool,
    pub edges_truncated: bool,
    pub truncation_warning: Option<String>,
}

impl Truncation {
    pub fn is_truncated(&self) -> bool {
        self.nodes_truncated || self.edges_truncated
    }

    /// Append a warning sentence, keeping earlier ones.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        self.truncation_warning = Some(match self.truncation_warning.take() {
            Some(existing) => format!("{} {}", existing, warning),
            None => warning,
        });
    }
}

/// Trim `nodes` (already in keep-priority order) and `edges` to the caps.
///
/// Edges touching a dropped node are removed before the edge cap applies, so
/// the result never references an absent node. Surviving edges keep their
/// input order.
pub fn truncate<N: NodeView, E: EdgeView>(
    mut nodes: Vec<N>,
    edges: Vec<E>,
    max_nodes: Option<usize>,
    max_edges: Option<usize>,
) -> (Vec<N>, Vec<E>, Truncation) {
    let mut report = Truncation {
        total_nodes: nodes.len(),
        total_edges: edges.len(),
        ..Truncation::default()
    };

    if let Some(cap) = max_nodes {
        if nodes.len() > cap {
            nodes.truncate(cap);
            report.nodes_truncated = true;
            report.add_warning(format!(
                "{}: kept {} of {} nodes.",
                EngineError::limit("Node", "max_nodes", cap),
                cap,
                report.total_nodes
            ));
        }
    }

    let kept: HashSet<&str> = nodes.iter().map(|n| n.key()).collect();
    let mut edges: Vec<E> = edges
        .into_iter()
        .filter(|e| kept.contains(e.source()) && kept.contains(e.target()))
        .collect();
    let consistent_edges = edges.len();

    if let Some(cap) = max_edges {
        if edges.len() > cap {
            edges.truncate(cap);
            report.edges_truncated = true;
            report.add_warning(format!(
                "{}: kept {} of {} edges.",
                EngineError::limit("Edge", "max_edges", cap),
                cap,
                report.total_edges
            ));
        }
    }
    if !report.edges_truncated && consistent_edges < report.total_edges {
        report.edges_truncated = true;
    }

    if report.is_truncated() {
        tracing::debug!(
            "Truncated graph to {} nodes / {} edges (from {} / {})",
            nodes.len(),
            edges.len(),
            report.total_nodes,
            report.total_edges
        );
    }

    (nodes, edges, report)
}
