//! Python adapter using tree-sitter

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use relmap_core::{
    CallSite, ClassDef, Exports, FunctionDef, ImportKind, ImportStatement, ImportedName, Language,
    MainGuard, ModuleSpec, SourceFile,
};
use tree_sitter::{Node, Tree};

use super::LanguageAdapter;

pub struct PythonAdapter;

impl LanguageAdapter for PythonAdapter {
    fn grammar(&self) -> tree_sitter::Language {
        tree_sitter_python::LANGUAGE.into()
    }

    fn extract(&self, path: &Path, tree: &Tree, source: &str) -> SourceFile {
        let mut visitor = ModuleVisitor {
            src: source.as_bytes(),
            file: SourceFile::empty(path, Language::Python),
            explicit_exports: None,
        };
        let root = tree.root_node();
        visitor.visit_block(root);
        visitor.collect_imports(root);

        let mut file = visitor.file;
        if let Some(names) = visitor.explicit_exports {
            file.exports = Exports::Explicit(names);
        }
        file
    }
}

fn line(node: Node) -> u32 {
    node.start_position().row as u32 + 1
}

fn end_line(node: Node) -> u32 {
    node.end_position().row as u32 + 1
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

struct ModuleVisitor<'s> {
    src: &'s [u8],
    file: SourceFile,
    /// `__all__`, when the module declares one.
    explicit_exports: Option<BTreeSet<String>>,
}

impl<'s> ModuleVisitor<'s> {
    fn text(&self, node: Node) -> &'s str {
        node.utf8_text(self.src).unwrap_or("")
    }

    /// Dotted text of an identifier/attribute chain, or None for anything
    /// else (subscripts, calls, literals).
    fn dotted(&self, node: Node) -> Option<String> {
        match node.kind() {
            "identifier" => Some(self.text(node).to_string()),
            "attribute" => {
                let object = self.dotted(node.child_by_field_name("object")?)?;
                let attribute = node.child_by_field_name("attribute")?;
                Some(format!("{}.{}", object, self.text(attribute)))
            }
            _ => None,
        }
    }

    fn compact(&self, node: Node) -> String {
        self.text(node).split_whitespace().collect()
    }

    // ── Module-level statements ─────────────────────────────

    fn visit_block(&mut self, block: Node) {
        for stmt in named_children(block) {
            self.visit_statement(stmt);
        }
    }

    fn visit_statement(&mut self, stmt: Node) {
        match stmt.kind() {
            "function_definition" => {
                let def = self.function(stmt, None, Vec::new());
                self.file.functions.push(def);
            }
            "class_definition" => self.class(stmt, Vec::new()),
            "decorated_definition" => {
                let decorators = self.decorators(stmt);
                if let Some(def) = stmt.child_by_field_name("definition") {
                    match def.kind() {
                        "function_definition" => {
                            let def = self.function(def, None, decorators);
                            self.file.functions.push(def);
                        }
                        "class_definition" => self.class(def, decorators),
                        _ => {}
                    }
                }
            }
            "expression_statement" => {
                for child in named_children(stmt) {
                    match child.kind() {
                        "assignment" => self.module_assignment(child),
                        "augmented_assignment" => self.augmented_all(child),
                        _ => {}
                    }
                }
            }
            "if_statement" if self.is_main_guard(stmt) => self.main_guard(stmt),
            "if_statement" | "try_statement" | "with_statement" => self.visit_compound(stmt),
            _ => {}
        }
    }

    /// Descend into the blocks of a module-level compound statement.
    fn visit_compound(&mut self, node: Node) {
        for child in named_children(node) {
            match child.kind() {
                "block" => self.visit_block(child),
                "elif_clause" | "else_clause" | "except_clause" | "except_group_clause"
                | "finally_clause" => self.visit_compound(child),
                _ => {}
            }
        }
    }

    fn module_assignment(&mut self, assignment: Node) {
        let Some(left) = assignment.child_by_field_name("left") else {
            return;
        };
        let targets = self.assignment_targets(left);
        if targets.iter().any(|t| t == "__all__") {
            if let Some(right) = assignment.child_by_field_name("right") {
                self.explicit_exports = Some(self.string_items(right));
            }
        }
        self.file.variables.extend(targets);
    }

    /// `__all__ += [...]`
    fn augmented_all(&mut self, node: Node) {
        let is_all = node
            .child_by_field_name("left")
            .is_some_and(|left| self.text(left) == "__all__");
        if !is_all {
            return;
        }
        if let Some(right) = node.child_by_field_name("right") {
            let items = self.string_items(right);
            self.explicit_exports.get_or_insert_with(BTreeSet::new).extend(items);
        }
    }

    fn assignment_targets(&self, left: Node) -> Vec<String> {
        match left.kind() {
            "identifier" => vec![self.text(left).to_string()],
            "pattern_list" | "tuple_pattern" | "list_pattern" => named_children(left)
                .into_iter()
                .flat_map(|child| self.assignment_targets(child))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn string_items(&self, node: Node) -> BTreeSet<String> {
        match node.kind() {
            "list" | "tuple" | "parenthesized_expression" => named_children(node)
                .into_iter()
                .filter(|c| c.kind() == "string")
                .map(|s| self.string_value(s))
                .filter(|s| !s.is_empty())
                .collect(),
            _ => BTreeSet::new(),
        }
    }

    fn string_value(&self, node: Node) -> String {
        named_children(node)
            .into_iter()
            .find(|c| c.kind() == "string_content")
            .map(|c| self.text(c).to_string())
            .unwrap_or_else(|| {
                self.text(node)
                    .trim_matches(|c| c == '"' || c == '\'')
                    .to_string()
            })
    }

    // ── Definitions ─────────────────────────────────────────

    fn decorators(&self, decorated: Node) -> Vec<String> {
        named_children(decorated)
            .into_iter()
            .filter(|c| c.kind() == "decorator")
            .filter_map(|d| {
                let expr = named_children(d).into_iter().next()?;
                let target = match expr.kind() {
                    "call" => expr.child_by_field_name("function")?,
                    _ => expr,
                };
                Some(self.dotted(target).unwrap_or_else(|| self.compact(target)))
            })
            .collect()
    }

    fn function(&self, node: Node, class_name: Option<&str>, decorators: Vec<String>) -> FunctionDef {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let mut def = FunctionDef {
            name,
            class_name: class_name.map(str::to_string),
            line: line(node),
            end_line: end_line(node),
            decorators,
            ..Default::default()
        };
        if let Some(params) = node.child_by_field_name("parameters") {
            self.parameter_types(params, &mut def.local_types);
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.scan_body(body, &mut def.calls, &mut def.local_types, &mut def.references);
        }
        def
    }

    fn parameter_types(&self, params: Node, types: &mut BTreeMap<String, String>) {
        for param in named_children(params) {
            let name = match param.kind() {
                "typed_parameter" => named_children(param)
                    .into_iter()
                    .find(|c| c.kind() == "identifier"),
                "typed_default_parameter" => param.child_by_field_name("name"),
                _ => None,
            };
            if let (Some(name), Some(ty)) = (name, param.child_by_field_name("type")) {
                types.insert(self.text(name).to_string(), self.compact(ty));
            }
        }
    }

    /// Collect call sites, inferred local types and referenced identifiers
    /// from a body, in source order.
    fn scan_body(
        &self,
        body: Node,
        calls: &mut Vec<CallSite>,
        types: &mut BTreeMap<String, String>,
        references: &mut BTreeSet<String>,
    ) {
        let mut stack = vec![body];
        while let Some(node) = stack.pop() {
            match node.kind() {
                "call" => {
                    if let Some(callee) = node
                        .child_by_field_name("function")
                        .and_then(|f| self.dotted(f))
                    {
                        calls.push(CallSite {
                            callee,
                            line: line(node),
                        });
                    }
                }
                "assignment" => self.assignment_type(node, types),
                "identifier" => {
                    references.insert(self.text(node).to_string());
                }
                _ => {}
            }
            let mut children = named_children(node);
            children.reverse();
            stack.extend(children);
        }
    }

    /// `x: T = ...` records `T`; `x = Ctor(...)` records `Ctor`.
    fn assignment_type(&self, assignment: Node, types: &mut BTreeMap<String, String>) {
        let Some(left) = assignment.child_by_field_name("left") else {
            return;
        };
        if left.kind() != "identifier" {
            return;
        }
        let name = self.text(left).to_string();
        if let Some(ty) = assignment.child_by_field_name("type") {
            types.insert(name, self.compact(ty));
            return;
        }
        let ctor = assignment
            .child_by_field_name("right")
            .filter(|r| r.kind() == "call")
            .and_then(|r| r.child_by_field_name("function"))
            .and_then(|f| self.dotted(f));
        if let Some(ctor) = ctor {
            types.insert(name, ctor);
        }
    }

    fn identifiers(&self, node: Node, out: &mut BTreeSet<String>) {
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            if n.kind() == "identifier" {
                out.insert(self.text(n).to_string());
            }
            stack.extend(named_children(n));
        }
    }

    fn class(&mut self, node: Node, decorators: Vec<String>) {
        let Some(name) = node.child_by_field_name("name").map(|n| self.text(n).to_string()) else {
            return;
        };
        let mut class = ClassDef {
            name: name.clone(),
            line: line(node),
            end_line: end_line(node),
            decorators,
            ..Default::default()
        };

        if let Some(superclasses) = node.child_by_field_name("superclasses") {
            class.bases = named_children(superclasses)
                .into_iter()
                .filter(|b| b.kind() != "keyword_argument")
                .map(|b| self.dotted(b).unwrap_or_else(|| self.compact(b)))
                .collect();
            self.identifiers(superclasses, &mut class.references);
        }

        let mut methods = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            self.identifiers(body, &mut class.references);
            for stmt in named_children(body) {
                let method = match stmt.kind() {
                    "function_definition" => Some(self.function(stmt, Some(&name), Vec::new())),
                    "decorated_definition" => {
                        let decorators = self.decorators(stmt);
                        stmt.child_by_field_name("definition")
                            .filter(|d| d.kind() == "function_definition")
                            .map(|d| self.function(d, Some(&name), decorators))
                    }
                    _ => None,
                };
                if let Some(method) = method {
                    class.methods.push(method.name.clone());
                    methods.push(method);
                }
            }
        }

        self.file.classes.push(class);
        self.file.functions.extend(methods);
    }

    // ── Main guard ──────────────────────────────────────────

    fn is_main_guard(&self, stmt: Node) -> bool {
        let Some(condition) = stmt.child_by_field_name("condition") else {
            return false;
        };
        let normalized = self.compact(condition).replace('\'', "\"");
        normalized == "__name__==\"__main__\"" || normalized == "\"__main__\"==__name__"
    }

    fn main_guard(&mut self, stmt: Node) {
        let mut guard = MainGuard {
            line: line(stmt),
            end_line: end_line(stmt),
            calls: Vec::new(),
            local_types: BTreeMap::new(),
        };
        if let Some(body) = stmt.child_by_field_name("consequence") {
            let mut references = BTreeSet::new();
            self.scan_body(body, &mut guard.calls, &mut guard.local_types, &mut references);
        }
        self.file.main_guard = Some(guard);
    }

    // ── Imports ─────────────────────────────────────────────

    /// Every import statement in the file, in source order.
    fn collect_imports(&mut self, root: Node) {
        let mut stack = vec![root];
        let mut imports = Vec::new();
        while let Some(node) = stack.pop() {
            match node.kind() {
                "import_statement" => imports.extend(self.plain_import(node)),
                "import_from_statement" => imports.extend(self.from_import(node)),
                _ => {
                    let mut children = named_children(node);
                    children.reverse();
                    stack.extend(children);
                }
            }
        }
        self.file.imports = imports;
    }

    /// `import a.b, c as d` yields one statement per module.
    fn plain_import(&self, node: Node) -> Vec<ImportStatement> {
        field_children(node, "name")
            .into_iter()
            .filter_map(|name| {
                let (module, alias) = match name.kind() {
                    "dotted_name" => (self.compact(name), None),
                    "aliased_import" => (
                        self.compact(name.child_by_field_name("name")?),
                        Some(self.text(name.child_by_field_name("alias")?).to_string()),
                    ),
                    _ => return None,
                };
                Some(ImportStatement {
                    kind: if alias.is_some() {
                        ImportKind::Aliased
                    } else {
                        ImportKind::Direct
                    },
                    module: ModuleSpec::absolute(module),
                    names: Vec::new(),
                    module_alias: alias,
                    line: line(node),
                })
            })
            .collect()
    }

    fn from_import(&self, node: Node) -> Option<ImportStatement> {
        let module_node = node.child_by_field_name("module_name")?;
        let module = ModuleSpec::parse(&self.compact(module_node));

        let wildcard = named_children(node)
            .iter()
            .any(|c| c.kind() == "wildcard_import");
        if wildcard {
            return Some(ImportStatement {
                kind: ImportKind::Wildcard,
                module,
                names: Vec::new(),
                module_alias: None,
                line: line(node),
            });
        }

        let names = field_children(node, "name")
            .into_iter()
            .filter_map(|name| match name.kind() {
                "dotted_name" => Some(ImportedName::plain(self.compact(name))),
                "aliased_import" => Some(ImportedName::aliased(
                    self.compact(name.child_by_field_name("name")?),
                    self.text(name.child_by_field_name("alias")?),
                )),
                _ => None,
            })
            .collect();

        Some(ImportStatement {
            kind: ImportKind::Direct,
            module,
            names,
            module_alias: None,
            line: line(node),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn extract(source: &str) -> SourceFile {
        let adapter = PythonAdapter;
        let mut parser = Parser::new();
        parser.set_language(&adapter.grammar()).unwrap();
        let tree = parser.parse(source, None).unwrap();
        adapter.extract(Path::new("pkg/mod.py"), &tree, source)
    }

    #[test]
    fn imports_in_source_order() {
        let file = extract(
            r#"
import os.path
import numpy as np, sys
from . import sibling
from ..core import Base as B, helper
from shapes import *
"#,
        );
        let modules: Vec<String> = file.imports.iter().map(|i| i.module.to_string()).collect();
        assert_eq!(modules, vec!["os.path", "numpy", "sys", ".", "..core", "shapes"]);

        assert_eq!(file.imports[1].module_alias.as_deref(), Some("np"));
        assert_eq!(file.imports[1].kind, ImportKind::Aliased);
        assert_eq!(file.imports[3].names[0], ImportedName::aliased("Base", "B"));
        assert_eq!(file.imports[3].names[1], ImportedName::plain("helper"));
        assert_eq!(file.imports[4].kind, ImportKind::Wildcard);
        assert_eq!(file.imports[4].line, 6);
    }

    #[test]
    fn explicit_all_is_read() {
        let file = extract("__all__ = ['area', \"volume\"]\n__all__ += ['extra']\n");
        match &file.exports {
            Exports::Explicit(names) => {
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                assert_eq!(names, vec!["area", "extra", "volume"]);
            }
            other => panic!("expected explicit exports, got {:?}", other),
        }
    }

    #[test]
    fn classes_methods_and_calls() {
        let file = extract(
            r#"
class Dog(Animal, metaclass=Meta):
    @property
    def name(self):
        return "dog"

    def fetch(self, ball: Ball):
        helper = Helper()
        self.speak()
        helper.run(ball)
"#,
        );
        let class = file.class("Dog").unwrap();
        assert_eq!(class.bases, vec!["Animal"]);
        assert_eq!(class.methods, vec!["name", "fetch"]);

        let fetch = file.functions.iter().find(|f| f.name == "fetch").unwrap();
        assert_eq!(fetch.class_name.as_deref(), Some("Dog"));
        let callees: Vec<&str> = fetch.calls.iter().map(|c| c.callee.as_str()).collect();
        assert_eq!(callees, vec!["Helper", "self.speak", "helper.run"]);
        assert_eq!(fetch.local_types.get("helper").map(String::as_str), Some("Helper"));
        assert_eq!(fetch.local_types.get("ball").map(String::as_str), Some("Ball"));

        let name = file.functions.iter().find(|f| f.name == "name").unwrap();
        assert_eq!(name.decorators, vec!["property"]);
    }

    #[test]
    fn decorators_drop_call_arguments() {
        let file = extract(
            r#"
@app.route("/users")
def users():
    pass

@click.command()
def cli():
    pass
"#,
        );
        assert_eq!(file.functions[0].decorators, vec!["app.route"]);
        assert_eq!(file.functions[1].decorators, vec!["click.command"]);
    }

    #[test]
    fn main_guard_and_variables() {
        let file = extract(
            r#"
VERSION = "1"
a, b = 1, 2
_private = 3

def run():
    pass

if __name__ == '__main__':
    app = App()
    run()
"#,
        );
        let guard = file.main_guard.as_ref().unwrap();
        assert_eq!(guard.line, 9);
        let callees: Vec<&str> = guard.calls.iter().map(|c| c.callee.as_str()).collect();
        assert_eq!(callees, vec!["App", "run"]);
        assert_eq!(guard.local_types.get("app").map(String::as_str), Some("App"));

        let vars: Vec<&str> = file.variables.iter().map(String::as_str).collect();
        assert_eq!(vars, vec!["VERSION", "_private", "a", "b"]);
        // Main-guard assignments are not module variables
        assert!(!file.variables.contains("app"));
    }

    #[test]
    fn definitions_under_module_level_try() {
        let file = extract(
            r#"
try:
    import ujson as json
except ImportError:
    import json

    def loads(s):
        return json.loads(s)
"#,
        );
        assert_eq!(file.imports.len(), 2);
        assert!(file.defines("loads"));
    }
}
