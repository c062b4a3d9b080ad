//! CLI command implementations

use std::path::PathBuf;

use relmap_core::{EngineError, StaticCapabilities, Tier, Tool};
use relmap_engine::{
    CallGraphRequest, DependencyRequest, RequestContext, build_call_graph_async, resolve_dependencies_async,
};
use relmap_indexer::{EngineConfig, load_architecture_config};
use serde::Serialize;

pub struct GlobalOptions {
    pub root: PathBuf,
    pub tier: Tier,
    pub architecture: Option<PathBuf>,
}

impl GlobalOptions {
    fn context(&self, tool: Tool) -> anyhow::Result<RequestContext> {
        let config = EngineConfig::load_or_default(&self.root)?;
        let architecture = match &self.architecture {
            Some(path) => Some(load_architecture_config(path)?),
            None => None,
        };
        Ok(RequestContext::for_tier(&StaticCapabilities, tool, self.tier)
            .with_config(config)
            .with_architecture(architecture))
    }
}

pub async fn deps(
    options: GlobalOptions,
    file: PathBuf,
    symbol: Option<String>,
    code: bool,
    diagram: bool,
    max_depth: Option<usize>,
) -> anyhow::Result<()> {
    let ctx = options.context(Tool::SymbolDependencies)?;
    tracing::info!("Resolving dependencies of {} ({:?} tier)", file.display(), options.tier);

    let request = DependencyRequest {
        root: options.root,
        target_file: file,
        target_symbol: symbol,
        include_code: code,
        include_diagram: diagram,
        max_depth_override: max_depth,
    };
    emit(resolve_dependencies_async(request, ctx).await)
}

pub async fn calls(
    options: GlobalOptions,
    entry: Option<String>,
    depth: Option<usize>,
    check_imports: bool,
    diagram: bool,
) -> anyhow::Result<()> {
    let ctx = options.context(Tool::CallGraph)?;
    tracing::info!("Building call graph ({:?} tier)", options.tier);

    let request = CallGraphRequest {
        root: options.root,
        entry_point: entry,
        depth_limit: depth,
        check_circular_imports: check_imports,
        include_diagram: diagram,
    };
    emit(build_call_graph_async(request, ctx).await)
}

#[derive(Serialize)]
struct Failure {
    success: bool,
    error: relmap_core::ErrorRecord,
}

/// Print a result, or the structured error, as pretty JSON on stdout.
fn emit<T: Serialize>(result: Result<T, EngineError>) -> anyhow::Result<()> {
    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(e) => {
            let failure = Failure {
                success: false,
                error: e.to_record(),
            };
            println!("{}", serde_json::to_string_pretty(&failure)?);
            Err(e.into())
        }
    }
}
