//! The two request entry points: dependency resolution for one target and
//! a project call graph

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use relmap_core::model::{display_path, qualify};
use relmap_core::{
    ArchitectureReport, ArchitectureRules, CallEdge, CallNode, EdgeView, EngineError,
    GraphMetrics, Result, SourceFile, Symbol, Truncation, find_edge_cycles, render_mermaid, truncate,
};
use relmap_indexer::{Coordinator, ProjectIndex};

use crate::callgraph::CallGraphBuilder;
use crate::context::RequestContext;
use crate::coupling::ModuleBoundaries;
use crate::dependencies::{DependencyWalker, WalkOptions, import_edges};
use crate::entry_points::{EntryPointDetector, lookup_entry, reachable_from};
use crate::hierarchy::ClassHierarchy;
use crate::resolver::ImportResolver;
use crate::response::{CallGraphRequest, CallGraphResult, DependencyGraphResult, DependencyRequest, ScanSummary};

/// Resolve the files `request.target_file` depends on.
///
/// Fails on a missing root, target file or symbol, and when the target
/// itself does not parse. Everything else (unparseable neighbours,
/// external imports, limits, timeouts) is reported inside the result.
pub fn resolve_dependencies(request: &DependencyRequest, ctx: &RequestContext) -> Result<DependencyGraphResult> {
    let root = request.root.as_path();
    ensure_root(root)?;
    let target = normalize_target(root, &request.target_file)?;
    let target_path = display_path(&target);
    let caps = &ctx.capabilities;

    // The file cap applies to the walk, not the scan
    let index = Coordinator::new(root, &ctx.config).run_full_index()?;
    let target_idx = index
        .position(&target)
        .ok_or_else(|| EngineError::not_found("file", target_path.clone()))?;
    let target_file = &index.files[target_idx];
    if let Some(message) = &target_file.parse_error {
        return Err(EngineError::ParseFailure {
            path: target_path,
            message: message.clone(),
        });
    }
    let target_symbol = match &request.target_symbol {
        Some(symbol) => {
            let key = qualify(&target, symbol);
            Some(index.symbols.lookup(&key).ok_or_else(|| EngineError::not_found("symbol", key))?)
        }
        None => None,
    };

    let resolver = ImportResolver::new(&index.files);
    let max_depth = caps.effective_depth(request.max_depth_override);
    let walk = DependencyWalker::new(
        &resolver,
        WalkOptions {
            max_depth,
            max_files: caps.max_files,
            confidence: ctx.config.confidence,
            expand_wildcards: caps.advanced_resolution,
        },
    )
    .walk(target_idx, request.target_symbol.as_deref(), &ctx.budget);

    let mut nodes = walk.nodes;
    nodes.sort_by(|a, b| (a.distance, &a.path).cmp(&(b.distance, &b.path)));
    let mut edges = walk.edges;
    edges.sort_by(|a, b| (a.hop, &a.from, &a.to, &a.via_symbol).cmp(&(b.hop, &b.from, &b.to, &b.via_symbol)));

    let cycles = find_edge_cycles(&edges);
    let coupling_score = if caps.coupling_analysis {
        Some(ModuleBoundaries::compile(&ctx.config.module_boundaries)?.score(&target_path, &edges))
    } else {
        None
    };
    let metrics = caps.enterprise_metrics.then(|| GraphMetrics::compute(&nodes, &edges));
    let files: Vec<String> = nodes.iter().map(|n| n.path.clone()).collect();
    let architecture = architecture_report(ctx, &files, &edges)?;

    let mut limits = Vec::new();
    if let (true, Some(d)) = (walk.depth_limited, max_depth) {
        limits.push(format!(
            "{}: imports beyond hop {} were not followed.",
            EngineError::limit("Depth", "max_depth", d),
            d
        ));
    }
    if let (true, Some(cap)) = (walk.file_budget_hit, caps.max_files) {
        limits.push(format!(
            "{}: the walk stopped adding files.",
            EngineError::limit("File", "max_files", cap)
        ));
    }

    let (mut nodes, edges, truncation) = truncate(nodes, edges, caps.max_nodes, caps.max_edges);
    let truncation = merge_warnings(limits, truncation);
    let truncated = truncation.is_truncated() || truncation.truncation_warning.is_some();

    if let Some(metrics) = &metrics {
        metrics.annotate(&mut nodes);
    }
    let diagram = request.include_diagram.then(|| render_mermaid(&nodes, &edges));
    let code = if request.include_code {
        Some(target_code(root, target_file, target_symbol.as_ref())?)
    } else {
        None
    };

    let timed_out = walk.timeout.is_some();
    tracing::info!(
        "Resolved dependencies of {}: {} nodes, {} edges, {} cycles{}",
        target_path,
        nodes.len(),
        edges.len(),
        cycles.len(),
        if timed_out { " (timed out)" } else { "" }
    );

    Ok(DependencyGraphResult {
        success: !timed_out,
        target_file: target_path,
        target_symbol: request.target_symbol.clone(),
        nodes,
        edges,
        cycles,
        unresolved_imports: walk.unresolved,
        truncated,
        truncation,
        max_depth,
        scan: ScanSummary {
            files_scanned: index.files_scanned,
            files_truncated: index.files_truncated,
            parse_failures: index.parse_failures,
        },
        code,
        diagram,
        coupling_score,
        wildcard_expansions: caps.advanced_resolution.then_some(walk.wildcard_expansions),
        hot_nodes: metrics.as_ref().map(|m| m.hot_nodes.clone()),
        dead_code_candidates: metrics.map(|m| m.dead_code_candidates),
        architecture,
        timed_out,
        error: walk.timeout.map(|e| e.to_record()),
    })
}

/// Build the call graph of the project under `request.root`, optionally
/// restricted to what an entry point reaches.
pub fn build_call_graph(request: &CallGraphRequest, ctx: &RequestContext) -> Result<CallGraphResult> {
    let root = request.root.as_path();
    ensure_root(root)?;
    let caps = &ctx.capabilities;

    let index = Coordinator::new(root, &ctx.config)
        .max_files(caps.max_files)
        .run_full_index()?;
    let resolver = ImportResolver::new(&index.files);
    let hierarchy = caps.advanced_resolution.then(|| ClassHierarchy::build(&resolver));
    let detector = EntryPointDetector::new(&ctx.config.entry_points)?;
    let built = CallGraphBuilder::new(&resolver, hierarchy.as_ref(), &detector).build(&ctx.budget);
    let mut timeout = built.timeout;
    let graph = built.graph;
    let depth_limit = caps.effective_depth(request.depth_limit);

    let mut nodes: Vec<CallNode> = graph.nodes().map(|(_, _, n)| n.clone()).collect();
    let mut edges: Vec<CallEdge> = graph.edges().map(|(_, _, e)| e.clone()).collect();
    let mut unresolved = built.unresolved;

    if let Some(entry) = &request.entry_point {
        ensure_entry_file_parsed(&index, entry)?;
        let roots = lookup_entry(&graph, entry)?;
        let (reached, reach_timeout) = reachable_from(&graph, &roots, depth_limit, &ctx.budget);
        if timeout.is_none() {
            timeout = reach_timeout;
        }
        let keep: BTreeSet<&str> = reached.keys().filter_map(|id| graph.key(*id)).collect();
        let requested: BTreeSet<&str> = roots.iter().filter_map(|id| graph.key(*id)).collect();

        nodes.retain(|n| keep.contains(n.qualified_name.as_str()));
        for node in &mut nodes {
            if requested.contains(node.qualified_name.as_str()) {
                node.is_entry_point = true;
            }
        }
        edges.retain(|e| keep.contains(e.caller.as_str()) && keep.contains(e.callee.as_str()));
        unresolved.retain(|u| keep.contains(u.caller.as_str()));
    }

    nodes.sort_by(|a, b| (!a.is_entry_point, &a.qualified_name).cmp(&(!b.is_entry_point, &b.qualified_name)));
    edges.sort_by(|a, b| (&a.caller, &a.callee, a.line).cmp(&(&b.caller, &b.callee, b.line)));

    let cycles = find_edge_cycles(&edges);
    let file_edges = (request.check_circular_imports || ctx.architecture.is_some()).then(|| import_edges(&resolver));
    let circular_imports = match (&file_edges, request.check_circular_imports) {
        (Some(file_edges), true) => Some(find_edge_cycles(file_edges)),
        _ => None,
    };
    let metrics = caps.enterprise_metrics.then(|| GraphMetrics::compute(&nodes, &edges));
    let architecture = match &file_edges {
        Some(file_edges) => {
            let files: Vec<String> = index.files.iter().map(SourceFile::display_path).collect();
            architecture_report(ctx, &files, file_edges)?
        }
        None => None,
    };

    let mut limits = Vec::new();
    if let (true, Some(cap)) = (index.files_truncated, caps.max_files) {
        limits.push(format!(
            "{}: scanned {} of {} candidate files.",
            EngineError::limit("File", "max_files", cap),
            index.files_scanned,
            index.total_candidates
        ));
    }

    let (mut nodes, edges, truncation) = truncate(nodes, edges, caps.max_nodes, caps.max_edges);
    let truncation = merge_warnings(limits, truncation);
    let truncated = truncation.is_truncated() || truncation.truncation_warning.is_some();
    if let Some(metrics) = &metrics {
        metrics.annotate(&mut nodes);
    }
    let entry_points: Vec<String> = nodes
        .iter()
        .filter(|n| n.is_entry_point)
        .map(|n| n.qualified_name.clone())
        .collect();
    let diagram = request.include_diagram.then(|| render_mermaid(&nodes, &edges));

    let timed_out = timeout.is_some();
    tracing::info!(
        "Built call graph for {}: {} nodes, {} edges, {} entry points{}",
        root.display(),
        nodes.len(),
        edges.len(),
        entry_points.len(),
        if timed_out { " (timed out)" } else { "" }
    );

    Ok(CallGraphResult {
        success: !timed_out,
        nodes,
        edges,
        entry_points,
        cycles,
        circular_imports,
        unresolved_calls: unresolved,
        truncated,
        truncation,
        depth_limit,
        scan: ScanSummary {
            files_scanned: index.files_scanned,
            files_truncated: index.files_truncated,
            parse_failures: index.parse_failures,
        },
        diagram,
        hot_nodes: metrics.as_ref().map(|m| m.hot_nodes.clone()),
        dead_code_candidates: metrics.map(|m| m.dead_code_candidates),
        architecture,
        timed_out,
        error: timeout.map(|e| e.to_record()),
    })
}

/// [`resolve_dependencies`] on the blocking thread pool.
pub async fn resolve_dependencies_async(
    request: DependencyRequest,
    ctx: RequestContext,
) -> Result<DependencyGraphResult> {
    tokio::task::spawn_blocking(move || resolve_dependencies(&request, &ctx))
        .await
        .map_err(|e| EngineError::Internal(format!("dependency task failed: {}", e)))?
}

/// [`build_call_graph`] on the blocking thread pool.
pub async fn build_call_graph_async(request: CallGraphRequest, ctx: RequestContext) -> Result<CallGraphResult> {
    tokio::task::spawn_blocking(move || build_call_graph(&request, &ctx))
        .await
        .map_err(|e| EngineError::Internal(format!("call graph task failed: {}", e)))?
}

fn ensure_root(root: &Path) -> Result<()> {
    if root.is_dir() {
        Ok(())
    } else {
        Err(EngineError::not_found("project root", root.display().to_string()))
    }
}

/// An entry point named by `path:` in a file that failed to parse is a
/// parse failure of the request target, not a missing entry point.
fn ensure_entry_file_parsed(index: &ProjectIndex, entry: &str) -> Result<()> {
    let Some((path, _)) = entry.split_once(':') else {
        return Ok(());
    };
    let degraded = index
        .position(Path::new(path))
        .and_then(|idx| index.files[idx].parse_error.as_ref());
    match degraded {
        Some(message) => Err(EngineError::ParseFailure {
            path: path.to_string(),
            message: message.clone(),
        }),
        None => Ok(()),
    }
}

/// Root-relative path of the target, which must be an existing file.
fn normalize_target(root: &Path, target: &Path) -> Result<PathBuf> {
    let relative = match target.strip_prefix(root) {
        Ok(stripped) => stripped.to_path_buf(),
        Err(_) if target.is_absolute() => {
            return Err(EngineError::not_found("file", target.display().to_string()));
        }
        Err(_) => target.to_path_buf(),
    };
    if !root.join(&relative).is_file() {
        return Err(EngineError::not_found("file", display_path(&relative)));
    }
    Ok(relative)
}

/// Truncation metadata with walk-limit warnings ahead of the cap warnings.
fn merge_warnings(limits: Vec<String>, mut truncation: Truncation) -> Truncation {
    let caps = truncation.truncation_warning.take();
    for warning in limits.into_iter().chain(caps) {
        truncation.add_warning(warning);
    }
    truncation
}

fn architecture_report<E: EdgeView>(
    ctx: &RequestContext,
    files: &[String],
    edges: &[E],
) -> Result<Option<ArchitectureReport>> {
    match (&ctx.architecture, ctx.capabilities.architectural_rules) {
        (Some(config), true) => Ok(Some(ArchitectureRules::compile(config)?.check(files, edges))),
        _ => Ok(None),
    }
}

/// Source of the target symbol, or of the whole file when no symbol was
/// requested or the symbol has no line span.
fn target_code(root: &Path, file: &SourceFile, symbol: Option<&Symbol>) -> Result<String> {
    let source = std::fs::read_to_string(root.join(&file.path))?;
    let Some(symbol) = symbol.filter(|s| s.line > 0) else {
        return Ok(source);
    };
    let first = symbol.line as usize - 1;
    let count = (symbol.end_line.max(symbol.line) - symbol.line) as usize + 1;
    let lines: Vec<&str> = source.lines().skip(first).take(count).collect();
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use relmap_core::test_utils::create_python_repo;
    use relmap_core::{ErrorKind, Tier, TierCapabilities, Tool};

    fn context(tool: Tool, tier: Tier) -> RequestContext {
        RequestContext::new(TierCapabilities::defaults_for(tool, tier))
    }

    #[test]
    fn target_may_be_absolute() {
        let repo = create_python_repo();
        let request = DependencyRequest {
            root: repo.path().to_path_buf(),
            target_file: repo.path().join("app/main.py"),
            ..Default::default()
        };
        let result = resolve_dependencies(&request, &context(Tool::SymbolDependencies, Tier::Pro)).unwrap();
        assert_eq!(result.target_file, "app/main.py");
        assert!(result.success);
    }

    #[test]
    fn symbol_code_is_sliced() {
        let repo = create_python_repo();
        let request = DependencyRequest {
            root: repo.path().to_path_buf(),
            target_file: PathBuf::from("app/animals.py"),
            target_symbol: Some("Dog".to_string()),
            include_code: true,
            ..Default::default()
        };
        let result = resolve_dependencies(&request, &context(Tool::SymbolDependencies, Tier::Community)).unwrap();
        let code = result.code.unwrap();
        assert!(code.starts_with("class Dog(Animal):"));
        assert!(code.contains("def fetch(self):"));
        assert!(!code.contains("class Animal"));
    }

    #[test]
    fn missing_symbol_and_file_fail() {
        let repo = create_python_repo();
        let ctx = context(Tool::SymbolDependencies, Tier::Community);
        let missing_symbol = DependencyRequest {
            root: repo.path().to_path_buf(),
            target_file: PathBuf::from("app/animals.py"),
            target_symbol: Some("Cat".to_string()),
            ..Default::default()
        };
        let err = resolve_dependencies(&missing_symbol, &ctx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("app/animals.py:Cat"));

        let missing_file = DependencyRequest {
            root: repo.path().to_path_buf(),
            target_file: PathBuf::from("app/nope.py"),
            ..Default::default()
        };
        assert_eq!(resolve_dependencies(&missing_file, &ctx).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn warnings_keep_walk_limits_first() {
        let merged = merge_warnings(
            vec!["Depth limit reached (max_depth=1): x.".to_string()],
            Truncation {
                truncation_warning: Some("Node limit reached (max_nodes=2): y.".to_string()),
                nodes_truncated: true,
                ..Default::default()
            },
        );
        assert_eq!(
            merged.truncation_warning.as_deref(),
            Some("Depth limit reached (max_depth=1): x. Node limit reached (max_nodes=2): y.")
        );
    }

    #[test]
    fn unknown_entry_point_is_not_found() {
        let repo = create_python_repo();
        let request = CallGraphRequest {
            root: repo.path().to_path_buf(),
            entry_point: Some("does_not_exist".to_string()),
            ..Default::default()
        };
        let err = build_call_graph(&request, &context(Tool::CallGraph, Tier::Pro)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
