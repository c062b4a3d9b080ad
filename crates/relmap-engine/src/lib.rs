//! Relmap Engine: import resolution, dependency walking and call graph
//! construction on top of an indexed project

pub mod callgraph;
pub mod context;
pub mod coupling;
pub mod dependencies;
pub mod entry_points;
pub mod hierarchy;
pub mod requests;
pub mod resolver;
pub mod response;


pub use callgraph::{BuiltCallGraph, CallGraphBuilder, MAIN_GUARD};
pub use context::RequestContext;
pub use coupling::ModuleBoundaries;
pub use dependencies::{DependencyWalker, StatementTarget, Walk, WalkOptions, import_edges, statement_targets};
pub use entry_points::{EntryPointDetector, lookup_entry, reachable_from};
pub use hierarchy::{ClassHierarchy, ClassId};
pub use requests::{build_call_graph, build_call_graph_async, resolve_dependencies, resolve_dependencies_async};
pub use resolver::{DottedResolution, ImportResolver, ModuleIndex, Resolution, Target};
pub use response::{
    CallGraphRequest, CallGraphResult, DependencyGraphResult, DependencyRequest, ScanSummary, UnresolvedCall,
    UnresolvedImport, WildcardExpansion,
};
