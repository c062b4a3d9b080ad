//! Relmap Core: data model, graph arena, and the graph passes shared by
//! dependency and call-graph requests (cycles, metrics, architecture rules,
//! truncation, rendering)

pub mod architecture;
pub mod budget;
pub mod capabilities;
pub mod cycles;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod model;
pub mod render;
pub mod symbols;
pub mod truncate;


#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use architecture::{
    ArchitectureConfig, ArchitectureReport, ArchitectureRules, LayerDef, Severity, Violation,
    ViolationKind,
};
pub use budget::{CancelHandle, RequestBudget};
pub use capabilities::{CapabilityResolver, StaticCapabilities, Tier, TierCapabilities, Tool};
pub use cycles::{find_cycles, find_edge_cycles};
pub use error::{EngineError, ErrorKind, ErrorRecord, Result};
pub use graph::{CodeGraph, EdgeId, NodeId};
pub use metrics::{GraphMetrics, HotNode};
pub use model::{
    CallEdge, CallNode, CallResolution, CallSite, ClassDef, DependencyEdge, DependencyNode,
    EXTERNAL, EdgeView, EntryPointKind, Exports, FunctionDef, ImportKind, ImportStatement,
    ImportedName, Language, MainGuard, ModuleSpec, NodeView, SourceFile, Symbol, SymbolKind,
};
pub use render::render_mermaid;
pub use symbols::SymbolTable;
pub use truncate::{Truncation, truncate};
