//! Core data structures: parsed source facts and the graph entities built from them

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Sentinel target for imports and calls that leave the analysed tree.
pub const EXTERNAL: &str = "<external>";

/// Supported languages for syntax-aware parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Other,
}

impl Language {
    /// Detect language from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("py") | Some("pyi") => Language::Python,
            _ => Language::Other,
        }
    }
}

/// Discriminates what kind of code entity a symbol represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Class,
    Method,
    Variable,
}

/// A named definition inside one file. `name` is dotted within the file
/// (`Dog.speak` for a method).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub file: PathBuf,
    pub kind: SymbolKind,
    pub line: u32,
    pub end_line: u32,
}

impl Symbol {
    /// `path:name`, unique across a run.
    pub fn qualified_name(&self) -> String {
        qualify(&self.file, &self.name)
    }
}

/// Build the run-wide key for a name defined in `file`.
pub fn qualify(file: &Path, name: &str) -> String {
    format!("{}:{}", display_path(file), name)
}

/// Forward-slash rendering of a relative path, stable across platforms.
pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

// ── Imports ─────────────────────────────────────────────────

/// How an import statement binds names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    /// `import a.b` / `from a import b`
    Direct,
    /// Any statement carrying an `as` clause.
    Aliased,
    /// `from a import *`
    Wildcard,
    /// `from . import x`, `from ..a import b`
    Relative,
    /// A `from` import inside a package `__init__`, re-publishing names.
    ReExport,
}

/// The module an import names, with its relative level (number of leading dots).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub path: String,
    pub level: u32,
}

impl ModuleSpec {
    pub fn absolute(path: impl Into<String>) -> Self {
        ModuleSpec {
            path: path.into(),
            level: 0,
        }
    }

    pub fn is_relative(&self) -> bool {
        self.level > 0
    }

    /// Parse source text such as `..pkg.mod` or `os.path`.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        let level = trimmed.chars().take_while(|c| *c == '.').count();
        ModuleSpec {
            path: trimmed[level..].to_string(),
            level: level as u32,
        }
    }
}

impl fmt::Display for ModuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.level {
            f.write_str(".")?;
        }
        f.write_str(&self.path)
    }
}

/// One name pulled out of a module by a `from` import.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImportedName {
    pub name: String,
    pub alias: Option<String>,
}

impl ImportedName {
    pub fn plain(name: impl Into<String>) -> Self {
        ImportedName {
            name: name.into(),
            alias: None,
        }
    }

    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        ImportedName {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }

    /// The name this import introduces into the importing module.
    pub fn bound_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// One import line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStatement {
    pub kind: ImportKind,
    pub module: ModuleSpec,
    /// Names listed after `import` in a `from` statement. Empty for plain
    /// module imports and wildcards.
    pub names: Vec<ImportedName>,
    /// `import a.b as c` binds `c` to the module itself.
    pub module_alias: Option<String>,
    pub line: u32,
}

impl ImportStatement {
    pub fn is_from_import(&self) -> bool {
        self.kind == ImportKind::Wildcard || !self.names.is_empty()
    }

    /// Original name → alias for every `as` clause in the statement.
    pub fn alias_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        if let Some(alias) = &self.module_alias {
            map.insert(self.module.path.clone(), alias.clone());
        }
        for name in &self.names {
            if let Some(alias) = &name.alias {
                map.insert(name.name.clone(), alias.clone());
            }
        }
        map
    }

    /// Names bound in the importing module (excluding wildcard expansion).
    pub fn bound_names(&self) -> Vec<String> {
        if self.kind == ImportKind::Wildcard {
            return Vec::new();
        }
        if !self.names.is_empty() {
            return self.names.iter().map(|n| n.bound_name().to_string()).collect();
        }
        match &self.module_alias {
            Some(alias) => vec![alias.clone()],
            None => self
                .module
                .path
                .split('.')
                .next()
                .filter(|s| !s.is_empty())
                .map(|s| vec![s.to_string()])
                .unwrap_or_default(),
        }
    }
}

/// The public names a module makes available to `import *`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "names", rename_all = "snake_case")]
pub enum Exports {
    /// An explicit export list (`__all__`), used verbatim.
    Explicit(BTreeSet<String>),
    /// Derived from the public-name heuristic.
    Heuristic(BTreeSet<String>),
}

impl Exports {
    pub fn names(&self) -> &BTreeSet<String> {
        match self {
            Exports::Explicit(names) | Exports::Heuristic(names) => names,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names().contains(name)
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self, Exports::Explicit(_))
    }
}

impl Default for Exports {
    fn default() -> Self {
        Exports::Heuristic(BTreeSet::new())
    }
}

// ── Definitions ─────────────────────────────────────────────

/// A call expression inside a function body. `callee` is the dotted callee
/// text (`helper`, `self.speak`, `models.Dog`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub callee: String,
    pub line: u32,
}

/// A top-level function or a method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FunctionDef {
    pub name: String,
    pub class_name: Option<String>,
    pub line: u32,
    pub end_line: u32,
    /// Dotted decorator names without `@` or call arguments.
    pub decorators: Vec<String>,
    pub calls: Vec<CallSite>,
    /// Local name → declared or inferred type expression.
    pub local_types: BTreeMap<String, String>,
    /// Identifiers the body reads.
    pub references: BTreeSet<String>,
}

impl FunctionDef {
    /// `Class.method` or the bare function name.
    pub fn local_name(&self) -> String {
        match &self.class_name {
            Some(class) => format!("{}.{}", class, self.name),
            None => self.name.clone(),
        }
    }
}

/// A class and the facts needed to walk its hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ClassDef {
    pub name: String,
    /// Base class expressions in declaration order.
    pub bases: Vec<String>,
    pub line: u32,
    pub end_line: u32,
    pub methods: Vec<String>,
    pub decorators: Vec<String>,
    pub references: BTreeSet<String>,
}

/// The body of `if __name__ == "__main__":`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainGuard {
    pub line: u32,
    pub end_line: u32,
    pub calls: Vec<CallSite>,
    pub local_types: BTreeMap<String, String>,
}

/// One parsed file. `path` is relative to the project root and unique within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub language: Language,
    pub exports: Exports,
    pub imports: Vec<ImportStatement>,
    pub symbols: Vec<Symbol>,
    pub functions: Vec<FunctionDef>,
    pub classes: Vec<ClassDef>,
    pub main_guard: Option<MainGuard>,
    /// Module-level assignment targets.
    pub variables: BTreeSet<String>,
    /// Set when the file failed to parse; all other collections are empty.
    pub parse_error: Option<String>,
}

impl SourceFile {
    pub fn empty(path: impl Into<PathBuf>, language: Language) -> Self {
        SourceFile {
            path: path.into(),
            language,
            exports: Exports::default(),
            imports: Vec::new(),
            symbols: Vec::new(),
            functions: Vec::new(),
            classes: Vec::new(),
            main_guard: None,
            variables: BTreeSet::new(),
            parse_error: None,
        }
    }

    /// A node for a file that could not be parsed.
    pub fn degraded(path: impl Into<PathBuf>, language: Language, error: impl Into<String>) -> Self {
        let mut file = Self::empty(path, language);
        file.parse_error = Some(error.into());
        file
    }

    pub fn is_degraded(&self) -> bool {
        self.parse_error.is_some()
    }

    /// Whether this file is a package aggregator (`__init__.py`).
    pub fn is_package_init(&self) -> bool {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|s| s == "__init__")
    }

    /// Dotted module name derived from the relative path.
    pub fn module_name(&self) -> String {
        module_name_for(&self.path)
    }

    /// Whether `name` is defined (not imported) at module level.
    pub fn defines(&self, name: &str) -> bool {
        self.functions
            .iter()
            .any(|f| f.class_name.is_none() && f.name == name)
            || self.classes.iter().any(|c| c.name == name)
            || self.variables.contains(name)
    }

    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.name == name)
    }

    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.iter().find(|c| c.name == name)
    }

    pub fn display_path(&self) -> String {
        display_path(&self.path)
    }
}

/// `pkg/sub/mod.py` → `pkg.sub.mod`, `pkg/__init__.py` → `pkg`.
pub fn module_name_for(path: &Path) -> String {
    let mut parts: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    if let Some(last) = parts.pop() {
        let stem = Path::new(&last)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or(last);
        if stem != "__init__" {
            parts.push(stem);
        }
    }
    parts.join(".")
}

// ── Graph entities ──────────────────────────────────────────

/// Common view over graph nodes used by the metrics, truncation and rendering passes.
pub trait NodeView {
    fn key(&self) -> &str;

    fn label(&self) -> String {
        self.key().to_string()
    }

    fn is_entry(&self) -> bool {
        false
    }

    fn set_degree(&mut self, in_degree: usize, out_degree: usize);
}

/// Common view over graph edges.
pub trait EdgeView {
    fn source(&self) -> &str;
    fn target(&self) -> &str;

    fn label(&self) -> Option<String> {
        None
    }
}

/// A file touched by a dependency request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyNode {
    pub path: String,
    pub language: Language,
    /// Import steps from the target: the target is 0, its direct imports 1.
    /// A node first reached by an edge of hop `h` sits at distance `h + 1`.
    pub distance: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_degree: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_degree: Option<usize>,
}

impl NodeView for DependencyNode {
    fn key(&self) -> &str {
        &self.path
    }

    fn is_entry(&self) -> bool {
        self.distance == 0
    }

    fn set_degree(&mut self, in_degree: usize, out_degree: usize) {
        self.in_degree = Some(in_degree);
        self.out_degree = Some(out_degree);
    }
}

/// A resolved file-level dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    pub via_symbol: Option<String>,
    pub confidence: f64,
    /// Distance of `from`: edges out of the target are hop 0.
    pub hop: u32,
    pub line: u32,
    /// Aggregator files followed to reach the defining file.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub via_reexport: Vec<String>,
}

impl EdgeView for DependencyEdge {
    fn source(&self) -> &str {
        &self.from
    }

    fn target(&self) -> &str {
        &self.to
    }

    fn label(&self) -> Option<String> {
        Some(format!("{:.2}", self.confidence))
    }
}

/// Why a function was flagged as an entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPointKind {
    MainGuard,
    CliCommand,
    WebRoute,
    Test,
}

/// One function or method in a call graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallNode {
    pub qualified_name: String,
    pub file: String,
    pub line: u32,
    pub end_line: u32,
    pub is_entry_point: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_kind: Option<EntryPointKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_degree: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_degree: Option<usize>,
}

impl NodeView for CallNode {
    fn key(&self) -> &str {
        &self.qualified_name
    }

    fn is_entry(&self) -> bool {
        self.is_entry_point
    }

    fn set_degree(&mut self, in_degree: usize, out_degree: usize) {
        self.in_degree = Some(in_degree);
        self.out_degree = Some(out_degree);
    }
}

/// How a call site was matched to its callee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallResolution {
    /// Same-file name lookup.
    Local,
    /// Through an import binding.
    Import,
    /// `self.x()` against the enclosing class.
    SelfMethod,
    /// Most-derived override through the class hierarchy.
    Polymorphic,
}

/// One resolved call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEdge {
    pub caller: String,
    pub callee: String,
    pub line: u32,
    pub resolution: CallResolution,
}

impl EdgeView for CallEdge {
    fn source(&self) -> &str {
        &self.caller
    }

    fn target(&self) -> &str {
        &self.callee
    }
}
