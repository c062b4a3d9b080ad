//! Dependency chain walker: breadth-first expansion of resolved imports from
//! a target file, with per-hop confidence decay

use std::collections::{BTreeSet, HashMap, HashSet};

use relmap_core::model::display_path;
use relmap_core::{
    DependencyEdge, DependencyNode, EXTERNAL, EngineError, ImportKind, ImportStatement, RequestBudget,
    SourceFile,
};
use relmap_indexer::ConfidencePolicy;

use crate::resolver::{ImportResolver, Resolution};
use crate::response::{UnresolvedImport, WildcardExpansion};

/// One thing an import statement points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementTarget {
    pub resolution: Resolution,
    /// Absolute module name, or the source text when it could not be made absolute.
    pub module: String,
    /// Name imported from the module, for `from` imports.
    pub name: Option<String>,
    /// Name the statement binds in the importing file; None for `*`.
    pub binding: Option<String>,
    pub via_symbol: Option<String>,
    pub line: u32,
}

/// Resolve every target of one import statement of `file`.
pub fn statement_targets(resolver: &ImportResolver, file: usize, stmt: &ImportStatement) -> Vec<StatementTarget> {
    let Some(module) = resolver.absolute_module(file, &stmt.module) else {
        let reason = "relative import beyond the project root".to_string();
        let external = |name: Option<String>, binding: Option<String>| StatementTarget {
            resolution: Resolution::External { reason: reason.clone() },
            module: stmt.module.to_string(),
            via_symbol: name.clone(),
            name,
            binding,
            line: stmt.line,
        };
        if stmt.names.is_empty() {
            let binding = stmt.bound_names().into_iter().next();
            return vec![external(None, binding)];
        }
        return stmt
            .names
            .iter()
            .map(|n| external(Some(n.name.clone()), Some(n.bound_name().to_string())))
            .collect();
    };

    if stmt.kind == ImportKind::Wildcard {
        return vec![StatementTarget {
            resolution: resolver.resolve_module(file, &module),
            module,
            name: None,
            binding: None,
            via_symbol: Some("*".to_string()),
            line: stmt.line,
        }];
    }

    if !stmt.names.is_empty() {
        return stmt
            .names
            .iter()
            .map(|imported| StatementTarget {
                resolution: resolver.resolve_member(file, &module, &imported.name),
                module: module.clone(),
                name: Some(imported.name.clone()),
                binding: Some(imported.bound_name().to_string()),
                via_symbol: Some(imported.name.clone()),
                line: stmt.line,
            })
            .collect();
    }

    vec![StatementTarget {
        resolution: resolver.resolve_module(file, &module),
        binding: stmt.bound_names().into_iter().next(),
        module,
        name: None,
        via_symbol: None,
        line: stmt.line,
    }]
}

/// Identifiers a symbol's definition uses. `None` means the symbol does
/// not narrow the imports (module-level variables).
pub fn symbol_references(file: &SourceFile, symbol: &str) -> Option<BTreeSet<String>> {
    fn heads(names: &[String]) -> impl Iterator<Item = String> + '_ {
        names.iter().filter_map(|n| n.split('.').next()).map(str::to_string)
    }

    if let Some(function) = file.functions.iter().find(|f| f.local_name() == symbol) {
        let mut refs = function.references.clone();
        refs.extend(heads(&function.decorators));
        refs.extend(function.local_types.values().filter_map(|t| t.split('.').next().map(str::to_string)));
        return Some(refs);
    }
    if let Some(class) = file.class(symbol) {
        let mut refs = class.references.clone();
        refs.extend(heads(&class.bases));
        refs.extend(heads(&class.decorators));
        return Some(refs);
    }
    None
}

#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Hops of edges to emit; edges at hop `d` are kept while `d < max_depth`.
    pub max_depth: Option<usize>,
    /// Node budget, target included.
    pub max_files: Option<usize>,
    pub confidence: ConfidencePolicy,
    pub expand_wildcards: bool,
}

/// Output of one walk. Nodes are in discovery order.
#[derive(Debug, Default)]
pub struct Walk {
    pub nodes: Vec<DependencyNode>,
    pub edges: Vec<DependencyEdge>,
    pub unresolved: Vec<UnresolvedImport>,
    pub wildcard_expansions: Vec<WildcardExpansion>,
    pub depth_limited: bool,
    pub file_budget_hit: bool,
    pub timeout: Option<EngineError>,
}

pub struct DependencyWalker<'r, 'a> {
    resolver: &'r ImportResolver<'a>,
    options: WalkOptions,
}

impl<'r, 'a> DependencyWalker<'r, 'a> {
    pub fn new(resolver: &'r ImportResolver<'a>, options: WalkOptions) -> Self {
        DependencyWalker { resolver, options }
    }

    /// Expand from `target`. When `symbol` is given only the target's imports
    /// that the symbol uses are followed; wildcards are always followed.
    pub fn walk(&self, target: usize, symbol: Option<&str>, budget: &RequestBudget) -> Walk {
        let files = self.resolver.files();
        let filter = symbol.and_then(|s| symbol_references(&files[target], s));

        let mut walk = Walk::default();
        let mut distance: HashMap<usize, u32> = HashMap::new();
        let mut edge_keys: HashSet<(usize, usize, Option<String>)> = HashSet::new();

        distance.insert(target, 0);
        walk.nodes.push(self.node(target, 0));
        let mut frontier = vec![target];
        let mut hop: u32 = 0;

        while !frontier.is_empty() {
            if let Err(e) = budget.check("dependency walk") {
                walk.timeout = Some(e);
                break;
            }

            let at_limit = self.options.max_depth.is_some_and(|d| hop as usize >= d);
            let mut next = Vec::new();

            for &file in &frontier {
                let narrowing = if file == target { filter.as_ref() } else { None };
                for stmt in &files[file].imports {
                    let targets: Vec<StatementTarget> = statement_targets(self.resolver, file, stmt)
                        .into_iter()
                        .filter(|t| match (narrowing, &t.binding) {
                            (Some(refs), Some(binding)) => refs.contains(binding),
                            _ => true,
                        })
                        .collect();
                    if targets.is_empty() {
                        continue;
                    }

                    if at_limit {
                        if targets
                            .iter()
                            .any(|t| t.resolution.target().is_some_and(|r| r.file != file))
                        {
                            walk.depth_limited = true;
                        }
                        continue;
                    }

                    if self.options.expand_wildcards && stmt.kind == ImportKind::Wildcard {
                        self.record_wildcard(file, &targets, &mut walk);
                    }

                    for t in targets {
                        match t.resolution {
                            Resolution::Internal(resolved) => {
                                let to = resolved.file;
                                if to == file {
                                    continue;
                                }
                                if !distance.contains_key(&to) {
                                    if self.options.max_files.is_some_and(|cap| walk.nodes.len() >= cap) {
                                        walk.file_budget_hit = true;
                                        continue;
                                    }
                                    distance.insert(to, hop + 1);
                                    walk.nodes.push(self.node(to, hop + 1));
                                    next.push(to);
                                }
                                if !edge_keys.insert((file, to, t.via_symbol.clone())) {
                                    continue;
                                }
                                walk.edges.push(DependencyEdge {
                                    from: self.resolver.path(file),
                                    to: self.resolver.path(to),
                                    via_symbol: t.via_symbol,
                                    confidence: self.options.confidence.at(hop),
                                    hop,
                                    line: t.line,
                                    via_reexport: resolved.via.iter().map(|v| self.resolver.path(*v)).collect(),
                                });
                            }
                            Resolution::External { reason } => {
                                let error = EngineError::UnresolvedImport {
                                    file: self.resolver.path(file),
                                    module: t.module.clone(),
                                };
                                tracing::debug!("{} ({})", error, reason);
                                walk.unresolved.push(UnresolvedImport {
                                    kind: error.kind(),
                                    file: self.resolver.path(file),
                                    module: t.module,
                                    name: t.name,
                                    line: t.line,
                                    reason,
                                    resolved_to: EXTERNAL.to_string(),
                                    chain: Vec::new(),
                                });
                            }
                            Resolution::Cycle { chain } => {
                                let error = EngineError::CycleInAliasChain {
                                    file: self.resolver.path(file),
                                    chain: chain.clone(),
                                };
                                walk.unresolved.push(UnresolvedImport {
                                    kind: error.kind(),
                                    file: self.resolver.path(file),
                                    module: t.module,
                                    name: t.name,
                                    line: t.line,
                                    reason: error.to_string(),
                                    resolved_to: EXTERNAL.to_string(),
                                    chain,
                                });
                            }
                        }
                    }
                }
            }

            tracing::debug!("Dependency hop {}: {} new files", hop, next.len());
            if at_limit {
                break;
            }
            frontier = next;
            hop += 1;
        }

        walk
    }

    fn node(&self, file: usize, distance: u32) -> DependencyNode {
        let source = &self.resolver.files()[file];
        DependencyNode {
            path: display_path(&source.path),
            language: source.language,
            distance,
            parse_error: source.parse_error.clone(),
            in_degree: None,
            out_degree: None,
        }
    }

    fn record_wildcard(&self, file: usize, targets: &[StatementTarget], walk: &mut Walk) {
        for t in targets {
            let Some(resolved) = t.resolution.target() else {
                continue;
            };
            let exports = &self.resolver.files()[resolved.file].exports;
            walk.wildcard_expansions.push(WildcardExpansion {
                file: self.resolver.path(file),
                module: t.module.clone(),
                names: exports.names().iter().cloned().collect(),
                explicit: exports.is_explicit(),
            });
        }
    }
}

/// File-level import edges across the whole project, each resolved internal
/// dependency once.
pub fn import_edges(resolver: &ImportResolver) -> Vec<DependencyEdge> {
    let mut edges = Vec::new();
    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    for (file, source) in resolver.files().iter().enumerate() {
        for stmt in &source.imports {
            for t in statement_targets(resolver, file, stmt) {
                let Resolution::Internal(resolved) = t.resolution else {
                    continue;
                };
                if resolved.file == file || !seen.insert((file, resolved.file)) {
                    continue;
                }
                edges.push(DependencyEdge {
                    from: resolver.path(file),
                    to: resolver.path(resolved.file),
                    via_symbol: t.via_symbol,
                    confidence: 1.0,
                    hop: 0,
                    line: t.line,
                    via_reexport: resolved.via.iter().map(|v| resolver.path(*v)).collect(),
                });
            }
        }
    }
    edges
}
