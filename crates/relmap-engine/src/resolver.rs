//! Import resolution: module index, per-file name bindings, alias and
//! re-export chain following

use std::collections::{BTreeMap, HashSet};

use relmap_core::model::module_name_for;
use relmap_core::{ImportKind, ModuleSpec, SourceFile};

/// Dotted module name → file index.
#[derive(Debug, Default)]
pub struct ModuleIndex {
    modules: BTreeMap<String, usize>,
}

impl ModuleIndex {
    /// Index every file under its dotted module name. A file under a
    /// top-level directory that is not itself a package (`src/`, `tests/`) is
    /// also reachable without that prefix, as it would be with the directory
    /// on the import path.
    pub fn build(files: &[SourceFile]) -> Self {
        let packages: HashSet<String> = files
            .iter()
            .filter(|f| f.is_package_init())
            .map(|f| f.module_name())
            .collect();

        let mut ranked: BTreeMap<String, (u8, usize)> = BTreeMap::new();
        let mut aliases: BTreeMap<String, usize> = BTreeMap::new();

        for (idx, file) in files.iter().enumerate() {
            let name = module_name_for(&file.path);
            if name.is_empty() {
                continue;
            }
            let rank = Self::rank(file);
            let better = ranked.get(&name).is_none_or(|(r, _)| rank < *r);
            if better {
                ranked.insert(name.clone(), (rank, idx));
            }

            if let Some((top, rest)) = name.split_once('.') {
                if !packages.contains(top) {
                    aliases.entry(rest.to_string()).or_insert(idx);
                }
            }
        }

        let mut modules: BTreeMap<String, usize> =
            ranked.into_iter().map(|(k, (_, idx))| (k, idx)).collect();
        for (name, idx) in aliases {
            modules.entry(name).or_insert(idx);
        }
        ModuleIndex { modules }
    }

    /// Packages beat plain modules, sources beat stubs.
    fn rank(file: &SourceFile) -> u8 {
        let stub = file.path.extension().is_some_and(|e| e == "pyi");
        match (file.is_package_init(), stub) {
            (true, false) => 0,
            (true, true) => 1,
            (false, false) => 2,
            (false, true) => 3,
        }
    }

    pub fn get(&self, module: &str) -> Option<usize> {
        self.modules.get(module).copied()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// What a module-level name is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Binding {
    /// Defined in this file.
    Local,
    /// `from module import name`; `module` is None when a relative import
    /// climbs above the project root.
    From { module: Option<String>, name: String },
    /// `import module` / `import module as alias`.
    Module { module: Option<String> },
}

/// A resolved reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub file: usize,
    /// Name inside `file`; None when the target is the module itself.
    pub symbol: Option<String>,
    /// Files that re-bound the name on the way, in traversal order.
    pub via: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Internal(Target),
    /// Outside the analysed tree or not found.
    External { reason: String },
    /// An alias or re-export chain that loops back on itself.
    Cycle { chain: Vec<String> },
}

impl Resolution {
    pub fn target(&self) -> Option<&Target> {
        match self {
            Resolution::Internal(target) => Some(target),
            _ => None,
        }
    }
}

/// Result of resolving a dotted expression such as `h.slugify` or
/// `Dog.create`: the deepest reference reached plus the segments left over
/// once a non-module symbol was hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DottedResolution {
    pub resolution: Resolution,
    pub rest: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Cursor {
    /// A name in a file's module namespace.
    Name { file: usize, name: String },
    /// A module as seen from `context`, optionally a member of it.
    Member {
        context: usize,
        module: String,
        name: Option<String>,
    },
}

pub struct ImportResolver<'a> {
    files: &'a [SourceFile],
    modules: ModuleIndex,
    bindings: Vec<BTreeMap<String, Binding>>,
}

impl<'a> ImportResolver<'a> {
    pub fn new(files: &'a [SourceFile]) -> Self {
        let modules = ModuleIndex::build(files);
        let mut resolver = ImportResolver {
            files,
            modules,
            bindings: Vec::new(),
        };
        resolver.bindings = (0..files.len()).map(|idx| resolver.bind_file(idx)).collect();
        resolver
    }

    pub fn files(&self) -> &'a [SourceFile] {
        self.files
    }

    pub fn modules(&self) -> &ModuleIndex {
        &self.modules
    }

    pub fn path(&self, file: usize) -> String {
        self.files[file].display_path()
    }

    /// Absolute dotted name of the module an import refers to, or None when
    /// a relative import climbs above the root.
    pub fn absolute_module(&self, file: usize, spec: &ModuleSpec) -> Option<String> {
        if !spec.is_relative() {
            return Some(spec.path.clone());
        }
        let source = &self.files[file];
        let own = source.module_name();
        let mut parts: Vec<&str> = own.split('.').filter(|p| !p.is_empty()).collect();
        if !source.is_package_init() {
            parts.pop();
        }
        for _ in 1..spec.level {
            parts.pop()?;
        }
        if !spec.path.is_empty() {
            parts.extend(spec.path.split('.'));
        }
        Some(parts.join("."))
    }

    fn bind_file(&self, idx: usize) -> BTreeMap<String, Binding> {
        let file = &self.files[idx];
        let mut bindings = BTreeMap::new();

        for import in &file.imports {
            let module = self.absolute_module(idx, &import.module);
            if import.kind == ImportKind::Wildcard {
                let exports = module
                    .as_deref()
                    .and_then(|m| self.modules.get(m))
                    .filter(|m| *m != idx)
                    .map(|m| self.files[m].exports.names().clone())
                    .unwrap_or_default();
                for name in exports {
                    bindings.insert(
                        name.clone(),
                        Binding::From {
                            module: module.clone(),
                            name,
                        },
                    );
                }
            } else if !import.names.is_empty() {
                for imported in &import.names {
                    bindings.insert(
                        imported.bound_name().to_string(),
                        Binding::From {
                            module: module.clone(),
                            name: imported.name.clone(),
                        },
                    );
                }
            } else if let Some(alias) = &import.module_alias {
                bindings.insert(alias.clone(), Binding::Module { module });
            } else if let Some(head) = import.module.path.split('.').next().filter(|h| !h.is_empty()) {
                bindings.insert(
                    head.to_string(),
                    Binding::Module {
                        module: Some(head.to_string()),
                    },
                );
            }
        }

        // Definitions shadow imports of the same name
        for function in file.functions.iter().filter(|f| f.class_name.is_none()) {
            bindings.insert(function.name.clone(), Binding::Local);
        }
        for class in &file.classes {
            bindings.insert(class.name.clone(), Binding::Local);
        }
        for variable in &file.variables {
            bindings.insert(variable.clone(), Binding::Local);
        }
        bindings
    }

    /// Resolve a module-level name of `file`.
    pub fn resolve_name(&self, file: usize, name: &str) -> Resolution {
        self.run(Cursor::Name {
            file,
            name: name.to_string(),
        })
    }

    /// Resolve a module (absolute dotted name) as seen from `context`.
    pub fn resolve_module(&self, context: usize, module: &str) -> Resolution {
        self.run(Cursor::Member {
            context,
            module: module.to_string(),
            name: None,
        })
    }

    /// Resolve `from module import name` as seen from `context`.
    pub fn resolve_member(&self, context: usize, module: &str, name: &str) -> Resolution {
        self.run(Cursor::Member {
            context,
            module: module.to_string(),
            name: Some(name.to_string()),
        })
    }

    /// Resolve a dotted expression used in `file`, descending through
    /// modules until a symbol is reached.
    pub fn resolve_dotted(&self, file: usize, dotted: &str) -> DottedResolution {
        let mut segments = dotted.split('.').map(str::to_string);
        let Some(head) = segments.next() else {
            return DottedResolution {
                resolution: Resolution::External {
                    reason: "empty name".to_string(),
                },
                rest: Vec::new(),
            };
        };
        let mut rest: Vec<String> = segments.collect();
        rest.reverse();

        let mut resolution = match self.namespace_module(file, &head, &mut rest) {
            Some(module) => self.resolve_module(file, &module),
            None => self.resolve_name(file, &head),
        };
        loop {
            let Resolution::Internal(target) = &resolution else {
                break;
            };
            if target.symbol.is_some() {
                break;
            }
            let Some(segment) = rest.pop() else {
                break;
            };
            let next = self.resolve_name(target.file, &segment);
            resolution = match next {
                Resolution::Internal(mut inner) => {
                    let mut via = target.via.clone();
                    via.append(&mut inner.via);
                    inner.via = via;
                    Resolution::Internal(inner)
                }
                other => other,
            };
        }

        rest.reverse();
        DottedResolution { resolution, rest }
    }

    /// For `import ns.tools` where `ns` has no `__init__`, the indexed module
    /// reached by joining the following segments onto the bound head. The
    /// consumed segments are taken off `rest` (stored in reverse).
    fn namespace_module(&self, file: usize, head: &str, rest: &mut Vec<String>) -> Option<String> {
        let Some(Binding::Module { module: Some(bound) }) = self.bindings[file].get(head) else {
            return None;
        };
        if self.modules.get(bound).is_some() {
            return None;
        }
        let mut module = bound.clone();
        let mut taken = Vec::new();
        while let Some(segment) = rest.pop() {
            module = join(&module, &segment);
            taken.push(segment);
            if self.modules.get(&module).is_some() {
                return Some(module);
            }
        }
        while let Some(segment) = taken.pop() {
            rest.push(segment);
        }
        None
    }

    fn describe(&self, cursor: &Cursor) -> String {
        match cursor {
            Cursor::Name { file, name } => format!("{}:{}", self.path(*file), name),
            Cursor::Member {
                module,
                name: Some(name),
                ..
            } => format!("{}.{}", module, name),
            Cursor::Member { module, .. } => module.clone(),
        }
    }

    /// Follow bindings until a definition, a module, an external reference
    /// or a repeated step.
    fn run(&self, start: Cursor) -> Resolution {
        let origin = match &start {
            Cursor::Name { file, .. } => *file,
            Cursor::Member { context, .. } => *context,
        };
        let mut cursor = start;
        let mut visited: HashSet<Cursor> = HashSet::new();
        let mut chain: Vec<String> = Vec::new();
        let mut via: Vec<usize> = Vec::new();

        loop {
            chain.push(self.describe(&cursor));
            if !visited.insert(cursor.clone()) {
                tracing::debug!("Alias chain cycle: {}", chain.join(" -> "));
                return Resolution::Cycle { chain };
            }

            cursor = match cursor {
                Cursor::Name { file, name } => match self.bindings[file].get(&name) {
                    Some(Binding::Local) => {
                        return Resolution::Internal(Target {
                            file,
                            symbol: Some(name),
                            via,
                        });
                    }
                    Some(Binding::From {
                        module: Some(module),
                        name: original,
                    }) => {
                        // `from . import sub` inside the package's own init
                        if self.modules.get(module) == Some(file) {
                            if let Some(m) = self.modules.get(&join(module, original)) {
                                return Resolution::Internal(Target {
                                    file: m,
                                    symbol: None,
                                    via,
                                });
                            }
                        }
                        if file != origin {
                            via.push(file);
                        }
                        Cursor::Member {
                            context: file,
                            module: module.clone(),
                            name: Some(original.clone()),
                        }
                    }
                    Some(Binding::Module {
                        module: Some(module),
                    }) => {
                        if file != origin {
                            via.push(file);
                        }
                        Cursor::Member {
                            context: file,
                            module: module.clone(),
                            name: None,
                        }
                    }
                    Some(_) => {
                        return Resolution::External {
                            reason: "relative import beyond the project root".to_string(),
                        };
                    }
                    None => {
                        let submodule = join(&self.files[file].module_name(), &name);
                        if let Some(m) = self.modules.get(&submodule) {
                            return Resolution::Internal(Target {
                                file: m,
                                symbol: None,
                                via,
                            });
                        }
                        let reason = match &self.files[file].parse_error {
                            Some(_) => format!("`{}` is in an unparsed file {}", name, self.path(file)),
                            None => format!("`{}` is not defined in {}", name, self.path(file)),
                        };
                        return Resolution::External { reason };
                    }
                },
                Cursor::Member {
                    context,
                    module,
                    name,
                } => {
                    if let Some(m) = self.modules.get(&module) {
                        match name {
                            Some(name) => Cursor::Name { file: m, name },
                            None => {
                                return Resolution::Internal(Target {
                                    file: m,
                                    symbol: None,
                                    via,
                                });
                            }
                        }
                    } else if let Some(m) = name.as_deref().and_then(|n| self.modules.get(&join(&module, n))) {
                        // `from pkg import sub` without a pkg/__init__
                        return Resolution::Internal(Target {
                            file: m,
                            symbol: None,
                            via,
                        });
                    } else if let Some(expanded) = self.expand_alias(context, &module) {
                        Cursor::Member {
                            context,
                            module: expanded,
                            name,
                        }
                    } else {
                        return Resolution::External {
                            reason: format!("module `{}` is not part of the project", module),
                        };
                    }
                }
            };
        }
    }

    /// Rewrite a module path whose head is a local alias (`import X as Y`
    /// then `import Y as Z`) to the aliased module.
    fn expand_alias(&self, context: usize, module: &str) -> Option<String> {
        let (head, rest) = match module.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (module, None),
        };
        let base = match self.bindings[context].get(head)? {
            Binding::Module {
                module: Some(target),
            } if target != head => target.clone(),
            Binding::From {
                module: Some(target),
                name,
            } => join(target, name),
            _ => return None,
        };
        Some(match rest {
            Some(rest) => join(&base, rest),
            None => base,
        })
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}
