//! Integration tests for Relmap
//!
//! These drive both engine entry points against small on-disk projects.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use relmap_core::test_utils::{create_python_repo, create_repo_with_structure};
use relmap_core::{CallResolution, ErrorKind, RequestBudget, Tier, TierCapabilities, Tool};
use relmap_engine::{
    CallGraphRequest, CallGraphResult, DependencyGraphResult, DependencyRequest, RequestContext, build_call_graph,
    build_call_graph_async, resolve_dependencies, resolve_dependencies_async,
};

fn context(tool: Tool, tier: Tier) -> RequestContext {
    RequestContext::new(TierCapabilities::defaults_for(tool, tier))
}

fn deps(root: &Path, target: &str, tier: Tier) -> DependencyGraphResult {
    let request = DependencyRequest {
        root: root.to_path_buf(),
        target_file: PathBuf::from(target),
        ..Default::default()
    };
    resolve_dependencies(&request, &context(Tool::SymbolDependencies, tier)).unwrap()
}

fn calls(root: &Path, entry: Option<&str>, depth: Option<usize>, tier: Tier) -> CallGraphResult {
    let request = CallGraphRequest {
        root: root.to_path_buf(),
        entry_point: entry.map(str::to_string),
        depth_limit: depth,
        ..Default::default()
    };
    build_call_graph(&request, &context(Tool::CallGraph, tier)).unwrap()
}

fn assert_dependency_edges_consistent(result: &DependencyGraphResult) {
    let nodes: HashSet<&str> = result.nodes.iter().map(|n| n.path.as_str()).collect();
    for edge in &result.edges {
        assert!(nodes.contains(edge.from.as_str()), "dangling source {}", edge.from);
        assert!(nodes.contains(edge.to.as_str()), "dangling target {}", edge.to);
    }
}

fn assert_call_edges_consistent(result: &CallGraphResult) {
    let nodes: HashSet<&str> = result.nodes.iter().map(|n| n.qualified_name.as_str()).collect();
    for edge in &result.edges {
        assert!(nodes.contains(edge.caller.as_str()), "dangling caller {}", edge.caller);
        assert!(nodes.contains(edge.callee.as_str()), "dangling callee {}", edge.callee);
    }
}

/// `f0` calls `f1`, which calls `f2`, and so on up to `f{count-1}`.
fn call_chain_source(count: usize) -> String {
    let mut source = String::new();
    for i in 0..count {
        if i + 1 < count {
            source.push_str(&format!("def f{}():\n    return f{}()\n\n\n", i, i + 1));
        } else {
            source.push_str(&format!("def f{}():\n    return 0\n", i));
        }
    }
    source
}

#[test]
fn edges_reference_returned_nodes_in_every_tier() {
    let repo = create_python_repo();
    for tier in [Tier::Community, Tier::Pro, Tier::Enterprise] {
        assert_dependency_edges_consistent(&deps(repo.path(), "app/main.py", tier));
        assert_call_edges_consistent(&calls(repo.path(), None, None, tier));
        assert_call_edges_consistent(&calls(repo.path(), Some("run"), None, tier));
    }
}

#[test]
fn confidence_decays_per_hop() {
    let repo = create_repo_with_structure(&[
        ("a.py", "import b\n"),
        ("b.py", "import c\n"),
        ("c.py", "import d\n"),
        ("d.py", "import e\n"),
        ("e.py", "VALUE = 1\n"),
    ]);
    let result = deps(repo.path(), "a.py", Tier::Enterprise);

    assert_eq!(result.edges.len(), 4);
    for edge in &result.edges {
        assert_eq!(edge.confidence, 0.9f64.powi(edge.hop as i32));
    }
    let confidences: Vec<f64> = result.edges.iter().map(|e| e.confidence).collect();
    assert!(confidences.windows(2).all(|w| w[0] > w[1]));
    assert!(!result.truncated);
}

#[test]
fn three_file_import_cycle_is_reported_once() {
    let repo = create_repo_with_structure(&[
        ("a.py", "import b\n"),
        ("b.py", "import c\n"),
        ("c.py", "import a\n"),
    ]);
    let expected = vec![vec!["a.py".to_string(), "b.py".to_string(), "c.py".to_string()]];

    assert_eq!(deps(repo.path(), "a.py", Tier::Pro).cycles, expected);
    // Same canonical rotation whichever file the walk starts from
    assert_eq!(deps(repo.path(), "b.py", Tier::Pro).cycles, expected);
}

#[test]
fn aliased_alias_lands_on_the_same_file() {
    let repo = create_repo_with_structure(&[
        ("lib/__init__.py", ""),
        ("lib/engine.py", "def start():\n    pass\n"),
        ("main.py", "import lib.engine as Y\nimport Y as Z\n\nZ.start()\n"),
    ]);
    let result = deps(repo.path(), "main.py", Tier::Pro);

    let targets: Vec<&str> = result
        .edges
        .iter()
        .filter(|e| e.from == "main.py")
        .map(|e| e.to.as_str())
        .collect();
    assert_eq!(targets, vec!["lib/engine.py"]);
    assert!(result.unresolved_imports.is_empty());
}

#[test]
fn reexports_point_at_the_defining_file() {
    let repo = create_repo_with_structure(&[
        ("app/__init__.py", "from .models import User\n"),
        ("app/models/__init__.py", "from .user import User\n"),
        ("app/models/user.py", "class User:\n    pass\n"),
        ("main.py", "from app import User\n"),
    ]);
    let result = deps(repo.path(), "main.py", Tier::Pro);

    let edge = result
        .edges
        .iter()
        .find(|e| e.from == "main.py" && e.via_symbol.as_deref() == Some("User"))
        .unwrap();
    assert_eq!(edge.to, "app/models/user.py");
    assert_eq!(edge.via_reexport, vec!["app/__init__.py", "app/models/__init__.py"]);
    assert!(!result.edges.iter().any(|e| e.from == "main.py" && e.to == "app/__init__.py"));
}

#[test]
fn node_cap_truncates_deterministically() {
    let repo = create_repo_with_structure(&[("funcs.py", call_chain_source(75).as_str())]);

    let first = calls(repo.path(), None, None, Tier::Community);
    assert_eq!(first.nodes.len(), 50);
    assert!(first.truncated);
    assert!(first.truncation.nodes_truncated);
    assert_eq!(first.truncation.total_nodes, 75);
    assert!(
        first
            .truncation
            .truncation_warning
            .as_deref()
            .is_some_and(|w| w.contains("max_nodes=50"))
    );
    assert_call_edges_consistent(&first);

    let second = calls(repo.path(), None, None, Tier::Community);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn dependency_output_is_byte_identical_across_runs() {
    let repo = create_python_repo();
    let request = DependencyRequest {
        root: repo.path().to_path_buf(),
        target_file: PathBuf::from("app/main.py"),
        include_diagram: true,
        ..Default::default()
    };
    let ctx = context(Tool::SymbolDependencies, Tier::Enterprise);
    let first = resolve_dependencies(&request, &ctx).unwrap();
    let second = resolve_dependencies(&request, &ctx).unwrap();

    assert!(first.diagram.as_deref().is_some_and(|d| d.starts_with("flowchart TD\n")));
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn call_graph_diagram_snapshot() {
    let repo = create_repo_with_structure(&[(
        "app.py",
        "def run():\n    helper()\n\n\ndef helper():\n    pass\n\n\nif __name__ == \"__main__\":\n    run()\n",
    )]);
    let request = CallGraphRequest {
        root: repo.path().to_path_buf(),
        include_diagram: true,
        ..Default::default()
    };
    let result = build_call_graph(&request, &context(Tool::CallGraph, Tier::Pro)).unwrap();

    insta::assert_snapshot!(result.diagram.unwrap(), @r###"
    flowchart TD
        n0(["app.py:__main__"])
        n1["app.py:helper"]
        n2["app.py:run"]
        n0 --> n2
        n2 --> n1
        classDef entry fill:#e8f5e9,stroke:#2e7d32,stroke-width:2px
        class n0 entry
    "###);
}

#[test]
fn reachability_stops_at_the_depth_limit() {
    let repo = create_repo_with_structure(&[(
        "chain.py",
        "def e():\n    a()\n\ndef a():\n    b()\n\ndef b():\n    c()\n\ndef c():\n    pass\n",
    )]);
    let result = calls(repo.path(), Some("e"), Some(2), Tier::Community);

    let names: Vec<&str> = result.nodes.iter().map(|n| n.qualified_name.as_str()).collect();
    assert_eq!(names, vec!["chain.py:e", "chain.py:a", "chain.py:b"]);
    assert_eq!(result.depth_limit, Some(2));
    assert!(!names.contains(&"chain.py:c"));
    assert_call_edges_consistent(&result);
}

#[test]
fn disabled_features_leave_no_keys() {
    let repo = create_python_repo();

    let community = serde_json::to_value(deps(repo.path(), "app/main.py", Tier::Community)).unwrap();
    for key in ["coupling_score", "wildcard_expansions", "hot_nodes", "dead_code_candidates", "architecture"] {
        assert!(community.get(key).is_none(), "community leaked {}", key);
    }
    assert!(community["nodes"][0].get("in_degree").is_none());

    let pro = serde_json::to_value(deps(repo.path(), "app/main.py", Tier::Pro)).unwrap();
    assert!(pro.get("coupling_score").is_some());
    assert!(pro.get("wildcard_expansions").is_some());
    assert!(pro.get("hot_nodes").is_none());
    assert!(pro["nodes"][0].get("out_degree").is_none());

    let enterprise = serde_json::to_value(deps(repo.path(), "app/main.py", Tier::Enterprise)).unwrap();
    assert!(enterprise.get("hot_nodes").is_some());
    assert!(enterprise.get("dead_code_candidates").is_some());
    assert!(enterprise["nodes"][0].get("in_degree").is_some());

    let call_graph = serde_json::to_value(calls(repo.path(), None, None, Tier::Community)).unwrap();
    assert!(call_graph.get("hot_nodes").is_none());
    assert!(call_graph.get("circular_imports").is_none());
}

#[test]
fn self_call_binds_to_the_override() {
    let repo = create_python_repo();
    let result = calls(repo.path(), None, None, Tier::Pro);

    let edge = result
        .edges
        .iter()
        .find(|e| e.caller == "app/animals.py:Dog.fetch")
        .unwrap();
    assert_eq!(edge.callee, "app/animals.py:Dog.speak");
    assert_eq!(edge.resolution, CallResolution::SelfMethod);

    // Animal.describe may reach either implementation
    assert!(
        result
            .edges
            .iter()
            .any(|e| e.caller == "app/animals.py:Animal.describe" && e.callee == "app/animals.py:Animal.speak")
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

#[tokio::test]
async fn async_wrappers_match_blocking_results() {
    let repo = create_python_repo();
    let request = DependencyRequest {
        root: repo.path().to_path_buf(),
        target_file: PathBuf::from("app/main.py"),
        ..Default::default()
    };
    let ctx = context(Tool::SymbolDependencies, Tier::Pro);
    let blocking = resolve_dependencies(&request, &ctx).unwrap();
    let awaited = resolve_dependencies_async(request, ctx).await.unwrap();
    assert_eq!(blocking, awaited);

    let request = CallGraphRequest {
        root: repo.path().to_path_buf(),
        entry_point: Some("run".to_string()),
        ..Default::default()
    };
    let ctx = context(Tool::CallGraph, Tier::Pro);
    let blocking = build_call_graph(&request, &ctx).unwrap();
    let awaited = build_call_graph_async(request, ctx).await.unwrap();
    assert_eq!(blocking, awaited);
}

#[tokio::test]
async fn expired_deadline_yields_partial_result() {
    let repo = create_python_repo();
    let request = CallGraphRequest {
        root: repo.path().to_path_buf(),
        ..Default::default()
    };
    let ctx = context(Tool::CallGraph, Tier::Pro).with_budget(RequestBudget::from_millis(Some(0)));
    let result = build_call_graph_async(request, ctx).await.unwrap();

    assert!(!result.success);
    assert!(result.timed_out);
    assert_eq!(result.error.as_ref().map(|e| e.kind), Some(ErrorKind::Timeout));
    assert_call_edges_consistent(&result);
}
