//! Degree centrality, hot nodes and dead-code candidates

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{EdgeView, NodeView};

/// How many nodes `hot_nodes` reports.
pub const HOT_NODE_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotNode {
    pub name: String,
    pub in_degree: usize,
    pub out_degree: usize,
    pub total_degree: usize,
}

/// Output of the metrics pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GraphMetrics {
    /// node key → (in_degree, out_degree)
    pub degrees: BTreeMap<String, (usize, usize)>,
    pub hot_nodes: Vec<HotNode>,
    pub dead_code_candidates: Vec<String>,
}

impl GraphMetrics {
    /// Compute degree metrics from an edge set. Edges whose endpoints are not
    /// nodes are ignored.
    pub fn compute<N: NodeView, E: EdgeView>(nodes: &[N], edges: &[E]) -> Self {
        let mut degrees: BTreeMap<String, (usize, usize)> = nodes
            .iter()
            .map(|n| (n.key().to_string(), (0, 0)))
            .collect();

        for edge in edges {
            if !degrees.contains_key(edge.source()) || !degrees.contains_key(edge.target()) {
                continue;
            }
            if let Some(d) = degrees.get_mut(edge.source()) {
                d.1 += 1;
            }
            if let Some(d) = degrees.get_mut(edge.target()) {
                d.0 += 1;
            }
        }

        let mut ranked: Vec<HotNode> = degrees
            .iter()
            .map(|(name, (i, o))| HotNode {
                name: name.clone(),
                in_degree: *i,
                out_degree: *o,
                total_degree: i + o,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.total_degree
                .cmp(&a.total_degree)
                .then_with(|| a.name.cmp(&b.name))
        });
        ranked.truncate(HOT_NODE_LIMIT);

        let dead_code_candidates = nodes
            .iter()
            .filter(|n| !n.is_entry())
            .filter(|n| degrees.get(n.key()).is_some_and(|d| d.0 == 0))
            .map(|n| n.key().to_string())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();

        GraphMetrics {
            degrees,
            hot_nodes: ranked,
            dead_code_candidates,
        }
    }

    /// Copy degree values onto the nodes that carry them.
    pub fn annotate<N: NodeView>(&self, nodes: &mut [N]) {
        for node in nodes.iter_mut() {
            if let Some((i, o)) = self.degrees.get(node.key()).copied() {
                node.set_degree(i, o);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CallEdge, CallNode, CallResolution};

    fn node(name: &str, entry: bool) -> CallNode {
        CallNode {
            qualified_name: name.to_string(),
            file: "app.py".to_string(),
            line: 1,
            end_line: 2,
            is_entry_point: entry,
            entry_kind: None,
            in_degree: None,
            out_degree: None,
        }
    }

    fn edge(a: &str, b: &str) -> CallEdge {
        CallEdge {
            caller: a.to_string(),
            callee: b.to_string(),
            line: 1,
            resolution: CallResolution::Local,
        }
    }

    #[test]
    fn degrees_follow_edges() {
        let nodes = vec![node("a", true), node("b", false), node("c", false)];
        let edges = vec![edge("a", "b"), edge("a", "c"), edge("b", "c")];
        let metrics = GraphMetrics::compute(&nodes, &edges);
        assert_eq!(metrics.degrees["a"], (0, 2));
        assert_eq!(metrics.degrees["c"], (2, 0));
    }

    #[test]
    fn entry_points_are_not_dead_code() {
        let nodes = vec![node("main", true), node("used", false), node("orphan", false)];
        let edges = vec![edge("main", "used")];
        let metrics = GraphMetrics::compute(&nodes, &edges);
        assert_eq!(metrics.dead_code_candidates, vec!["orphan".to_string()]);
    }

    #[test]
    fn hot_nodes_break_ties_by_name() {
        let names: Vec<String> = (0..12).map(|i| format!("f{:02}", i)).collect();
        let nodes: Vec<CallNode> = names.iter().map(|n| node(n, false)).collect();
        // Every node has total degree 1 except the hub.
        let mut edges: Vec<CallEdge> = names[1..].iter().map(|n| edge("f00", n)).collect();
        edges.push(edge("f11", "f10"));
        let metrics = GraphMetrics::compute(&nodes, &edges);
        assert_eq!(metrics.hot_nodes.len(), HOT_NODE_LIMIT);
        assert_eq!(metrics.hot_nodes[0].name, "f00");
        assert_eq!(metrics.hot_nodes[1].name, "f10");
        assert_eq!(metrics.hot_nodes[2].name, "f11");
        assert_eq!(metrics.hot_nodes[3].name, "f01");
    }

    #[test]
    fn annotate_sets_degree_fields() {
        let mut nodes = vec![node("a", false), node("b", false)];
        let edges = vec![edge("a", "b")];
        let metrics = GraphMetrics::compute(&nodes, &edges);
        metrics.annotate(&mut nodes);
        assert_eq!(nodes[0].out_degree, Some(1));
        assert_eq!(nodes[1].in_degree, Some(1));
    }
}
