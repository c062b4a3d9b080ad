//! Entry point detection and depth-bounded reachability

use std::collections::BTreeMap;

use regex::RegexSet;
use relmap_core::{CodeGraph, EngineError, EntryPointKind, FunctionDef, NodeId, RequestBudget, Result};
use relmap_indexer::EntryPointPatterns;

const CLI_DECORATORS: &[&str] = &[
    r"^(click|typer)\.(command|group)$",
    r"^[A-Za-z_][A-Za-z0-9_]*\.(command|group)$",
];

const WEB_DECORATORS: &[&str] =
    &[r"^[A-Za-z_][A-Za-z0-9_.]*\.(route|get|post|put|patch|delete|head|options|websocket|api_route)$"];

const TEST_DECORATORS: &[&str] = &[r"^pytest\.mark\."];

/// Classifies functions by decorator and naming conventions.
pub struct EntryPointDetector {
    cli: RegexSet,
    web: RegexSet,
    test: RegexSet,
}

fn compile(defaults: &[&str], extra: &[String]) -> Result<RegexSet> {
    let patterns = defaults.iter().map(|p| p.to_string()).chain(extra.iter().cloned());
    RegexSet::new(patterns).map_err(|e| EngineError::Config(format!("invalid entry point pattern: {}", e)))
}

impl EntryPointDetector {
    pub fn new(patterns: &EntryPointPatterns) -> Result<Self> {
        Ok(EntryPointDetector {
            cli: compile(CLI_DECORATORS, &patterns.cli)?,
            web: compile(WEB_DECORATORS, &patterns.web)?,
            test: compile(TEST_DECORATORS, &patterns.test)?,
        })
    }

    /// Why `function` is an entry point, if it is one. Decorators are checked
    /// in order, web routes before CLI commands.
    pub fn classify(&self, function: &FunctionDef) -> Option<EntryPointKind> {
        for decorator in &function.decorators {
            if self.web.is_match(decorator) {
                return Some(EntryPointKind::WebRoute);
            }
            if self.cli.is_match(decorator) {
                return Some(EntryPointKind::CliCommand);
            }
            if self.test.is_match(decorator) {
                return Some(EntryPointKind::Test);
            }
        }

        let is_test = match &function.class_name {
            None => function.name.starts_with("test_"),
            Some(class) => class.starts_with("Test") && function.name.starts_with("test"),
        };
        is_test.then_some(EntryPointKind::Test)
    }
}

/// Nodes matching a requested entry point: an exact key when the request
/// carries a `path:` prefix, otherwise every node whose local name matches.
pub fn lookup_entry<N, E>(graph: &CodeGraph<N, E>, entry: &str) -> Result<Vec<NodeId>> {
    let found: Vec<NodeId> = if entry.contains(':') {
        graph.find(entry).into_iter().collect()
    } else {
        let suffix = format!(":{}", entry);
        graph
            .sorted_node_ids()
            .into_iter()
            .filter(|id| graph.key(*id).is_some_and(|k| k.ends_with(&suffix)))
            .collect()
    };
    if found.is_empty() {
        return Err(EngineError::not_found("entry point", entry));
    }
    Ok(found)
}

/// Shortest call distance from `roots` to every node within `depth_limit`
/// edges. Stops early with a timeout error once the budget runs out; the
/// map then holds what was reached so far.
pub fn reachable_from<N, E>(
    graph: &CodeGraph<N, E>,
    roots: &[NodeId],
    depth_limit: Option<usize>,
    budget: &RequestBudget,
) -> (BTreeMap<NodeId, usize>, Option<EngineError>) {
    let mut best: BTreeMap<NodeId, usize> = BTreeMap::new();
    let mut stack: Vec<(NodeId, usize)> = roots.iter().rev().map(|r| (*r, 0)).collect();

    while let Some((node, depth)) = stack.pop() {
        if let Err(e) = budget.check("reachability") {
            return (best, Some(e));
        }
        if best.get(&node).is_some_and(|d| *d <= depth) {
            continue;
        }
        best.insert(node, depth);
        if depth_limit.is_some_and(|limit| depth >= limit) {
            continue;
        }
        for next in graph.successors(node).into_iter().rev() {
            if best.get(&next).is_none_or(|d| *d > depth + 1) {
                stack.push((next, depth + 1));
            }
        }
    }
    (best, None)
}
