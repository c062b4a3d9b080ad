//! Call graph builder: one node per function or method, one edge per
//! resolved call site

use std::collections::{BTreeMap, HashSet};

use relmap_core::model::{display_path, qualify};
use relmap_core::{
    CallEdge, CallNode, CallResolution, CallSite, CodeGraph, EXTERNAL, EngineError, EntryPointKind,
    ErrorKind, NodeId, RequestBudget,
};

use crate::entry_points::EntryPointDetector;
use crate::hierarchy::{ClassHierarchy, ClassId};
use crate::resolver::{ImportResolver, Resolution};
use crate::response::UnresolvedCall;

/// Local name of the synthetic node standing for a main-guard body.
pub const MAIN_GUARD: &str = "__main__";

/// Python builtins; a bare call to one of these is not reported as unresolved.
const BUILTINS: &[&str] = &[
    "abs", "all", "any", "bool", "bytes", "callable", "dict", "dir", "enumerate", "Exception",
    "filter", "float", "format", "frozenset", "getattr", "hasattr", "hash", "id", "input",
    "int", "isinstance", "issubclass", "iter", "KeyError", "len", "list", "map", "max", "min",
    "next", "NotImplementedError", "object", "open", "print", "range", "repr", "reversed",
    "round", "RuntimeError", "set", "setattr", "sorted", "str", "sum", "super", "tuple",
    "type", "TypeError", "ValueError", "vars", "zip",
];

/// Outcome of resolving one call site.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Callee {
    Resolved { key: String, resolution: CallResolution },
    Unresolved(String),
    /// The callee's name goes through an alias chain that loops.
    AliasCycle(Vec<String>),
    /// Nothing worth reporting (builtins, classes without `__init__`).
    Ignored,
}

/// The scope a call site lives in.
struct Scope<'f> {
    file: usize,
    key: String,
    class_name: Option<&'f str>,
    local_types: &'f BTreeMap<String, String>,
    calls: &'f [CallSite],
}

pub struct BuiltCallGraph {
    pub graph: CodeGraph<CallNode, CallEdge>,
    pub unresolved: Vec<UnresolvedCall>,
    pub timeout: Option<EngineError>,
}

pub struct CallGraphBuilder<'r, 'a> {
    resolver: &'r ImportResolver<'a>,
    /// Present when polymorphic resolution is enabled.
    hierarchy: Option<&'r ClassHierarchy>,
    detector: &'r EntryPointDetector,
}

impl<'r, 'a> CallGraphBuilder<'r, 'a> {
    pub fn new(
        resolver: &'r ImportResolver<'a>,
        hierarchy: Option<&'r ClassHierarchy>,
        detector: &'r EntryPointDetector,
    ) -> Self {
        CallGraphBuilder {
            resolver,
            hierarchy,
            detector,
        }
    }

    pub fn build(&self, budget: &RequestBudget) -> BuiltCallGraph {
        let mut graph = CodeGraph::new();
        let scopes = self.add_nodes(&mut graph);

        let mut unresolved = Vec::new();
        let mut timeout = None;
        let mut seen: HashSet<(NodeId, NodeId, u32)> = HashSet::new();

        for scope in &scopes {
            if let Err(e) = budget.check("call graph") {
                timeout = Some(e);
                break;
            }
            let Some(caller) = graph.find(&scope.key) else {
                continue;
            };
            for site in scope.calls {
                match self.resolve_call(scope, &site.callee) {
                    Callee::Resolved { key, resolution } => {
                        let Some(callee) = graph.find(&key) else {
                            unresolved.push(unresolved_call(scope, site, format!("`{}` is not indexed", key)));
                            continue;
                        };
                        if !seen.insert((caller, callee, site.line)) {
                            continue;
                        }
                        graph.add_edge(
                            caller,
                            callee,
                            CallEdge {
                                caller: scope.key.clone(),
                                callee: key,
                                line: site.line,
                                resolution,
                            },
                        );
                    }
                    Callee::Unresolved(reason) => unresolved.push(unresolved_call(scope, site, reason)),
                    Callee::AliasCycle(chain) => {
                        let error = EngineError::CycleInAliasChain {
                            file: self.resolver.path(scope.file),
                            chain,
                        };
                        let mut record = unresolved_call(scope, site, error.to_string());
                        record.kind = error.kind();
                        unresolved.push(record);
                    }
                    Callee::Ignored => {}
                }
            }
        }

        tracing::debug!(
            "Call graph: {} nodes, {} edges, {} unresolved calls",
            graph.node_count(),
            graph.edge_count(),
            unresolved.len()
        );
        BuiltCallGraph {
            graph,
            unresolved,
            timeout,
        }
    }

    fn add_nodes(&self, graph: &mut CodeGraph<CallNode, CallEdge>) -> Vec<Scope<'a>> {
        let mut scopes = Vec::new();
        for (idx, file) in self.resolver.files().iter().enumerate() {
            let path = display_path(&file.path);
            for function in &file.functions {
                let key = qualify(&file.path, &function.local_name());
                let kind = self.detector.classify(function);
                graph.add_node(
                    key.clone(),
                    CallNode {
                        qualified_name: key.clone(),
                        file: path.clone(),
                        line: function.line,
                        end_line: function.end_line,
                        is_entry_point: kind.is_some(),
                        entry_kind: kind,
                        in_degree: None,
                        out_degree: None,
                    },
                );
                scopes.push(Scope {
                    file: idx,
                    key,
                    class_name: function.class_name.as_deref(),
                    local_types: &function.local_types,
                    calls: &function.calls,
                });
            }
            if let Some(guard) = &file.main_guard {
                let key = qualify(&file.path, MAIN_GUARD);
                graph.add_node(
                    key.clone(),
                    CallNode {
                        qualified_name: key.clone(),
                        file: path.clone(),
                        line: guard.line,
                        end_line: guard.end_line,
                        is_entry_point: true,
                        entry_kind: Some(EntryPointKind::MainGuard),
                        in_degree: None,
                        out_degree: None,
                    },
                );
                scopes.push(Scope {
                    file: idx,
                    key,
                    class_name: None,
                    local_types: &guard.local_types,
                    calls: &guard.calls,
                });
            }
        }
        scopes
    }

    fn resolve_call(&self, scope: &Scope, callee: &str) -> Callee {
        let segments: Vec<&str> = callee.split('.').collect();

        if let ([receiver, method], Some(class_name)) = (segments.as_slice(), scope.class_name) {
            if *receiver == "self" || *receiver == "cls" {
                return self.resolve_self_call(scope.file, class_name, method);
            }
        }

        if let [receiver, method] = segments.as_slice() {
            if let Some(ty) = scope.local_types.get(*receiver) {
                return self.resolve_typed_call(scope.file, ty, method);
            }
        }

        let dotted = self.resolver.resolve_dotted(scope.file, callee);
        match dotted.resolution {
            Resolution::Internal(target) => {
                let Some(symbol) = target.symbol else {
                    return Callee::Unresolved(format!("`{}` names a module", callee));
                };
                let resolution = if target.file == scope.file {
                    CallResolution::Local
                } else {
                    CallResolution::Import
                };
                self.resolve_symbol_call(target.file, &symbol, &dotted.rest, resolution)
            }
            Resolution::External { reason } => {
                if segments.len() == 1 && BUILTINS.contains(&callee) {
                    Callee::Ignored
                } else {
                    Callee::Unresolved(reason)
                }
            }
            Resolution::Cycle { chain } => Callee::AliasCycle(chain),
        }
    }

    /// `self.method()` inside `class_name`.
    fn resolve_self_call(&self, file: usize, class_name: &str, method: &str) -> Callee {
        let source = &self.resolver.files()[file];
        match self.hierarchy {
            Some(hierarchy) => {
                let Some(class) = hierarchy.find(&qualify(&source.path, class_name)) else {
                    return Callee::Unresolved(format!("class `{}` is not indexed", class_name));
                };
                match hierarchy.resolve_method(class, method) {
                    Some(owner) if owner == class => Callee::Resolved {
                        key: self.method_key(hierarchy, owner, method),
                        resolution: CallResolution::SelfMethod,
                    },
                    Some(owner) => Callee::Resolved {
                        key: self.method_key(hierarchy, owner, method),
                        resolution: CallResolution::Polymorphic,
                    },
                    None => Callee::Unresolved(format!(
                        "no `{}` in the class hierarchy of `{}`",
                        method, class_name
                    )),
                }
            }
            None => {
                let defined = source
                    .class(class_name)
                    .is_some_and(|c| c.methods.iter().any(|m| m == method));
                if defined {
                    Callee::Resolved {
                        key: qualify(&source.path, &format!("{}.{}", class_name, method)),
                        resolution: CallResolution::SelfMethod,
                    }
                } else {
                    Callee::Unresolved(format!("`{}` is not defined on `{}`", method, class_name))
                }
            }
        }
    }

    /// `receiver.method()` where the receiver's type was declared or inferred.
    fn resolve_typed_call(&self, file: usize, ty: &str, method: &str) -> Callee {
        let Some(hierarchy) = self.hierarchy else {
            return Callee::Unresolved(format!("receiver of type `{}` needs polymorphic resolution", ty));
        };
        let Some(class) = hierarchy.resolve_class(self.resolver, file, ty) else {
            return Callee::Unresolved(format!("receiver type `{}` is not a known class", ty));
        };
        match hierarchy.resolve_method(class, method) {
            Some(owner) => Callee::Resolved {
                key: self.method_key(hierarchy, owner, method),
                resolution: CallResolution::Polymorphic,
            },
            None => Callee::Unresolved(format!("no `{}` in the class hierarchy of `{}`", method, ty)),
        }
    }

    /// A call that resolved to `symbol` in `file`, with `rest` attribute
    /// segments left over.
    fn resolve_symbol_call(&self, file: usize, symbol: &str, rest: &[String], resolution: CallResolution) -> Callee {
        let source = &self.resolver.files()[file];
        let is_function = source
            .functions
            .iter()
            .any(|f| f.class_name.is_none() && f.name == symbol);

        match rest {
            [] if is_function => Callee::Resolved {
                key: qualify(&source.path, symbol),
                resolution,
            },
            [] if source.class(symbol).is_some() => match self.class_method(file, symbol, "__init__") {
                Some(key) => Callee::Resolved { key, resolution },
                None => Callee::Ignored,
            },
            [method] if source.class(symbol).is_some() => match self.class_method(file, symbol, method) {
                Some(key) => Callee::Resolved { key, resolution },
                None => Callee::Unresolved(format!("`{}` is not defined on `{}`", method, symbol)),
            },
            [] => Callee::Unresolved(format!("`{}` is not callable", symbol)),
            _ => Callee::Unresolved(format!("attribute `{}` of `{}` is dynamic", rest.join("."), symbol)),
        }
    }

    /// Key of `method` as seen on class `class_name` of `file`, inherited
    /// definitions included when the hierarchy is available.
    fn class_method(&self, file: usize, class_name: &str, method: &str) -> Option<String> {
        let source = &self.resolver.files()[file];
        match self.hierarchy {
            Some(hierarchy) => {
                let class = hierarchy.find(&qualify(&source.path, class_name))?;
                let owner = hierarchy.resolve_method(class, method)?;
                Some(self.method_key(hierarchy, owner, method))
            }
            None => source
                .class(class_name)
                .filter(|c| c.methods.iter().any(|m| m == method))
                .map(|_| qualify(&source.path, &format!("{}.{}", class_name, method))),
        }
    }

    fn method_key(&self, hierarchy: &ClassHierarchy, owner: ClassId, method: &str) -> String {
        let node = hierarchy.get(owner);
        qualify(
            &self.resolver.files()[node.file].path,
            &format!("{}.{}", node.name, method),
        )
    }
}

/// Calls with no edge are reported as imports that left the project.
fn unresolved_call(scope: &Scope, site: &CallSite, reason: String) -> UnresolvedCall {
    UnresolvedCall {
        kind: ErrorKind::UnresolvedImport,
        caller: scope.key.clone(),
        callee: site.callee.clone(),
        line: site.line,
        reason,
        resolved_to: EXTERNAL.to_string(),
    }
}
