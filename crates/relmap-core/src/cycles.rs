//! Cycle detection over a [`CodeGraph`] with white/gray/black DFS colouring

use std::collections::BTreeSet;

use crate::graph::{CodeGraph, NodeId};
use crate::model::EdgeView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Find every cycle closed by a back edge.
///
/// Each cycle is the ordered list of node keys starting at the
/// lexicographically smallest member; the closing repeat is omitted. Roots
/// are visited in key order so the result does not depend on insertion
/// order. Self-loops are reported as single-node cycles.
pub fn find_cycles<N, E>(graph: &CodeGraph<N, E>) -> Vec<Vec<String>> {
    let mut color = vec![Color::White; graph.node_bound()];
    let mut found: BTreeSet<Vec<String>> = BTreeSet::new();

    for root in graph.sorted_node_ids() {
        if color[root.0] != Color::White {
            continue;
        }

        // Explicit stack of (node, successors, next successor position).
        let mut stack: Vec<(NodeId, Vec<NodeId>, usize)> = Vec::new();
        let mut path: Vec<NodeId> = Vec::new();

        color[root.0] = Color::Gray;
        path.push(root);
        stack.push((root, graph.successors(root), 0));

        while let Some((node, succs, pos)) = stack.last_mut() {
            if *pos < succs.len() {
                let next = succs[*pos];
                *pos += 1;
                match color[next.0] {
                    Color::White => {
                        color[next.0] = Color::Gray;
                        path.push(next);
                        let next_succs = graph.successors(next);
                        stack.push((next, next_succs, 0));
                    }
                    Color::Gray => {
                        if let Some(start) = path.iter().position(|n| *n == next) {
                            let keys: Vec<String> = path[start..]
                                .iter()
                                .filter_map(|id| graph.key(*id).map(str::to_string))
                                .collect();
                            found.insert(canonical_rotation(keys));
                        }
                    }
                    Color::Black => {}
                }
            } else {
                color[node.0] = Color::Black;
                path.pop();
                stack.pop();
            }
        }
    }

    found.into_iter().collect()
}

/// Cycles over a flat edge list; nodes are implied by the edge endpoints.
pub fn find_edge_cycles<E: EdgeView>(edges: &[E]) -> Vec<Vec<String>> {
    let mut graph: CodeGraph<(), ()> = CodeGraph::new();
    for edge in edges {
        let source = graph.add_node(edge.source(), ());
        let target = graph.add_node(edge.target(), ());
        graph.add_edge(source, target, ());
    }
    find_cycles(&graph)
}

/// Rotate a cycle so its smallest key comes first.
pub fn canonical_rotation(mut cycle: Vec<String>) -> Vec<String> {
    if let Some(min_pos) = cycle
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
    {
        cycle.rotate_left(min_pos);
    }
    cycle
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_of(edges: &[(&str, &str)]) -> CodeGraph<(), ()> {
        let mut graph = CodeGraph::new();
        for (a, b) in edges {
            let a = graph.add_node(*a, ());
            let b = graph.add_node(*b, ());
            graph.add_edge(a, b, ());
        }
        graph
    }

    #[test]
    fn three_node_cycle_reported_once() {
        let graph = graph_of(&[("b.py", "c.py"), ("c.py", "a.py"), ("a.py", "b.py")]);
        let cycles = find_cycles(&graph);
        assert_eq!(cycles, vec![vec!["a.py", "b.py", "c.py"]]);
    }

    #[test]
    fn cycle_order_independent_of_insertion() {
        let first = graph_of(&[("a", "b"), ("b", "c"), ("c", "a")]);
        let second = graph_of(&[("c", "a"), ("b", "c"), ("a", "b")]);
        assert_eq!(find_cycles(&first), find_cycles(&second));
    }

    #[test]
    fn disjoint_cycles_all_reported() {
        let graph = graph_of(&[("a", "b"), ("b", "a"), ("x", "y"), ("y", "z"), ("z", "x")]);
        let cycles = find_cycles(&graph);
        assert_eq!(cycles.len(), 2);
        assert!(cycles.contains(&vec!["a".to_string(), "b".to_string()]));
        assert!(cycles.contains(&vec!["x".to_string(), "y".to_string(), "z".to_string()]));
    }

    #[test]
    fn self_loop_is_direct_recursion() {
        let graph = graph_of(&[("fact", "fact")]);
        assert_eq!(find_cycles(&graph), vec![vec!["fact"]]);
    }

    #[test]
    fn acyclic_chain_has_no_cycles() {
        let graph = graph_of(&[("a", "b"), ("b", "c"), ("a", "c")]);
        assert!(find_cycles(&graph).is_empty());
    }

    #[test]
    fn edge_list_cycles_match_graph_cycles() {
        use crate::model::{CallEdge, CallResolution};
        let edges: Vec<CallEdge> = [("m.py:even", "m.py:odd"), ("m.py:odd", "m.py:even"), ("m.py:odd", "m.py:log")]
            .iter()
            .map(|(a, b)| CallEdge {
                caller: a.to_string(),
                callee: b.to_string(),
                line: 1,
                resolution: CallResolution::Local,
            })
            .collect();
        assert_eq!(find_edge_cycles(&edges), vec![vec!["m.py:even", "m.py:odd"]]);
    }
}
