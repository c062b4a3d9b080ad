//! Deterministic Mermaid flowchart rendering

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::model::{EdgeView, NodeView};

/// Render a graph as a Mermaid `flowchart`.
///
/// Nodes are numbered in key order, entry points use the stadium shape and
/// the `entry` class, and edges are emitted sorted by (source, target, label).
/// Identical input always yields identical bytes.
pub fn render_mermaid<N: NodeView, E: EdgeView>(nodes: &[N], edges: &[E]) -> String {
    let mut sorted: Vec<&N> = nodes.iter().collect();
    sorted.sort_by(|a, b| a.key().cmp(b.key()));
    sorted.dedup_by(|a, b| a.key() == b.key());

    let ids: BTreeMap<&str, String> = sorted
        .iter()
        .enumerate()
        .map(|(i, n)| (n.key(), format!("n{}", i)))
        .collect();

    let mut out = String::from("flowchart TD\n");
    let mut entries = Vec::new();

    for node in &sorted {
        let id = &ids[node.key()];
        let label = escape_label(&node.label());
        if node.is_entry() {
            let _ = writeln!(out, "    {}([\"{}\"])", id, label);
            entries.push(id.as_str());
        } else {
            let _ = writeln!(out, "    {}[\"{}\"]", id, label);
        }
    }

    let mut lines: Vec<(&str, &str, Option<String>)> = edges
        .iter()
        .filter(|e| ids.contains_key(e.source()) && ids.contains_key(e.target()))
        .map(|e| (e.source(), e.target(), e.label()))
        .collect();
    lines.sort();
    lines.dedup();

    for (source, target, label) in lines {
        let (from, to) = (&ids[source], &ids[target]);
        match label {
            Some(label) => {
                let _ = writeln!(out, "    {} -->|{}| {}", from, escape_label(&label), to);
            }
            None => {
                let _ = writeln!(out, "    {} --> {}", from, to);
            }
        }
    }

    if !entries.is_empty() {
        out.push_str("    classDef entry fill:#e8f5e9,stroke:#2e7d32,stroke-width:2px\n");
        let _ = writeln!(out, "    class {} entry", entries.join(","));
    }

    out
}

fn escape_label(text: &str) -> String {
    text.replace('"', "#quot;")
        .replace('<', "#lt;")
        .replace('>', "#gt;")
        .replace('|', "#124;")
}
