//! Static class hierarchy: an arena of classes with resolved base links,
//! used for most-derived method lookup

use std::collections::{BTreeSet, HashMap};

use relmap_core::model::qualify;

use crate::resolver::{ImportResolver, Resolution};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub usize);

#[derive(Debug, Clone)]
pub struct ClassNode {
    pub file: usize,
    pub name: String,
    /// `path:Class`
    pub key: String,
    /// Resolved bases in declaration order. Unresolvable bases are skipped.
    pub bases: Vec<ClassId>,
    pub methods: BTreeSet<String>,
}

#[derive(Debug, Default)]
pub struct ClassHierarchy {
    classes: Vec<ClassNode>,
    by_key: HashMap<String, ClassId>,
}

impl ClassHierarchy {
    pub fn build(resolver: &ImportResolver) -> Self {
        let mut hierarchy = ClassHierarchy::default();
        for (file_idx, file) in resolver.files().iter().enumerate() {
            for class in &file.classes {
                let key = qualify(&file.path, &class.name);
                let id = ClassId(hierarchy.classes.len());
                hierarchy.by_key.entry(key.clone()).or_insert(id);
                hierarchy.classes.push(ClassNode {
                    file: file_idx,
                    name: class.name.clone(),
                    key,
                    bases: Vec::new(),
                    methods: class.methods.iter().cloned().collect(),
                });
            }
        }

        let mut links = Vec::new();
        for (i, node) in hierarchy.classes.iter().enumerate() {
            let file = &resolver.files()[node.file];
            let Some(class) = file.class(&node.name) else {
                continue;
            };
            for base in &class.bases {
                match hierarchy.resolve_class(resolver, node.file, base) {
                    Some(base_id) => links.push((i, base_id)),
                    None => tracing::debug!("Unresolved base {} of {}", base, node.key),
                }
            }
        }
        for (i, base) in links {
            hierarchy.classes[i].bases.push(base);
        }
        hierarchy
    }

    /// Resolve a class expression (`Animal`, `models.Animal`) used in `file`.
    pub fn resolve_class(&self, resolver: &ImportResolver, file: usize, expr: &str) -> Option<ClassId> {
        let dotted = resolver.resolve_dotted(file, expr);
        if !dotted.rest.is_empty() {
            return None;
        }
        match dotted.resolution {
            Resolution::Internal(target) => {
                let symbol = target.symbol?;
                let key = qualify(&resolver.files()[target.file].path, &symbol);
                self.by_key.get(&key).copied()
            }
            _ => None,
        }
    }

    pub fn get(&self, id: ClassId) -> &ClassNode {
        &self.classes[id.0]
    }

    pub fn find(&self, key: &str) -> Option<ClassId> {
        self.by_key.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Linearised lookup order: the class itself, then bases depth-first
    /// left to right, each class once.
    pub fn lookup_order(&self, id: ClassId) -> Vec<ClassId> {
        let mut order = Vec::new();
        let mut seen = BTreeSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            order.push(current);
            for base in self.classes[current.0].bases.iter().rev() {
                stack.push(*base);
            }
        }
        order
    }

    /// The most-derived definition of `method` visible from `id`.
    pub fn resolve_method(&self, id: ClassId, method: &str) -> Option<ClassId> {
        self.lookup_order(id)
            .into_iter()
            .find(|c| self.classes[c.0].methods.contains(method))
    }
}
