//! Architectural layer rules: layer mapping, boundary/layer/coupling violations

use std::collections::{BTreeMap, BTreeSet};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::model::EdgeView;

fn default_max_cross_layer_edges() -> usize {
    10
}

/// One logical layer and the file patterns that belong to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDef {
    pub name: String,
    pub patterns: Vec<String>,
}

/// Governance config. `layers` is ordered top to bottom and matched first-wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ArchitectureConfig {
    pub layers: Vec<LayerDef>,
    /// Layer → layers it may depend on. Same-layer edges are always allowed.
    #[serde(default)]
    pub allowed: BTreeMap<String, Vec<String>>,
    /// Globs; an edge touching a matching file is never reported.
    #[serde(default)]
    pub exemptions: Vec<String>,
    #[serde(default = "default_max_cross_layer_edges")]
    pub max_cross_layer_edges: usize,
}

impl ArchitectureConfig {
    /// Every layer referenced by a rule must be declared.
    pub fn validate(&self) -> Result<()> {
        let declared: BTreeSet<&str> = self.layers.iter().map(|l| l.name.as_str()).collect();
        if declared.len() != self.layers.len() {
            return Err(EngineError::Config("duplicate layer name".to_string()));
        }
        for (from, targets) in &self.allowed {
            if !declared.contains(from.as_str()) {
                return Err(EngineError::Config(format!(
                    "rule references undeclared layer `{}`",
                    from
                )));
            }
            for to in targets {
                if !declared.contains(to.as_str()) {
                    return Err(EngineError::Config(format!(
                        "rule `{}` references undeclared layer `{}`",
                        from, to
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A lower layer reaching up into a higher one.
    LayerViolation,
    /// A cross-layer edge missing from the allowed table.
    BoundaryViolation,
    /// A file with too many cross-layer edges.
    CouplingViolation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub source: String,
    pub target: Option<String>,
    pub rule: ViolationKind,
    pub severity: Severity,
    pub message: String,
}

/// Output of the rule engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ArchitectureReport {
    /// file → layer, for every file that matched a layer.
    pub layer_mapping: BTreeMap<String, String>,
    pub violations: Vec<Violation>,
}

/// Compiled form of an [`ArchitectureConfig`].
pub struct ArchitectureRules {
    layers: Vec<(String, GlobSet)>,
    allowed: BTreeMap<String, BTreeSet<String>>,
    exemptions: GlobSet,
    max_cross_layer_edges: usize,
}

fn compile_globset(globs: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for g in globs {
        let glob = Glob::new(g).map_err(|e| EngineError::Config(format!("invalid glob {:?}: {}", g, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| EngineError::Config(e.to_string()))
}

impl ArchitectureRules {
    pub fn compile(config: &ArchitectureConfig) -> Result<Self> {
        config.validate()?;
        let layers = config
            .layers
            .iter()
            .map(|l| Ok((l.name.clone(), compile_globset(&l.patterns)?)))
            .collect::<Result<Vec<_>>>()?;
        let allowed = config
            .allowed
            .iter()
            .map(|(k, v)| (k.clone(), v.iter().cloned().collect()))
            .collect();
        Ok(ArchitectureRules {
            layers,
            allowed,
            exemptions: compile_globset(&config.exemptions)?,
            max_cross_layer_edges: config.max_cross_layer_edges,
        })
    }

    /// First matching layer for a path.
    pub fn layer_for(&self, path: &str) -> Option<&str> {
        self.layers
            .iter()
            .find(|(_, set)| set.is_match(path))
            .map(|(name, _)| name.as_str())
    }

    fn rank(&self, layer: &str) -> Option<usize> {
        self.layers.iter().position(|(name, _)| name == layer)
    }

    fn is_exempt(&self, source: &str, target: &str) -> bool {
        self.exemptions.is_match(source) || self.exemptions.is_match(target)
    }

    /// Check every edge against the layer table.
    pub fn check<E: EdgeView>(&self, files: &[String], edges: &[E]) -> ArchitectureReport {
        let mut report = ArchitectureReport::default();
        for file in files {
            if let Some(layer) = self.layer_for(file) {
                report.layer_mapping.insert(file.clone(), layer.to_string());
            }
        }

        let mut seen: BTreeSet<(&str, &str)> = BTreeSet::new();
        let mut cross_layer: BTreeMap<&str, usize> = BTreeMap::new();

        for edge in edges {
            let (source, target) = (edge.source(), edge.target());
            if !seen.insert((source, target)) {
                continue;
            }
            let (Some(from_layer), Some(to_layer)) = (self.layer_for(source), self.layer_for(target)) else {
                continue;
            };
            if from_layer == to_layer {
                continue;
            }
            if self.is_exempt(source, target) {
                continue;
            }
            *cross_layer.entry(source).or_insert(0) += 1;

            let allowed = self
                .allowed
                .get(from_layer)
                .is_some_and(|targets| targets.contains(to_layer));
            if allowed {
                continue;
            }

            let upward = matches!(
                (self.rank(from_layer), self.rank(to_layer)),
                (Some(f), Some(t)) if t < f
            );
            let (rule, severity) = if upward {
                (ViolationKind::LayerViolation, Severity::Error)
            } else {
                (ViolationKind::BoundaryViolation, Severity::Warning)
            };
            report.violations.push(Violation {
                source: source.to_string(),
                target: Some(target.to_string()),
                rule,
                severity,
                message: format!(
                    "{} ({}) must not depend on {} ({})",
                    source, from_layer, target, to_layer
                ),
            });
        }

        for (file, count) in cross_layer {
            if count > self.max_cross_layer_edges {
                report.violations.push(Violation {
                    source: file.to_string(),
                    target: None,
                    rule: ViolationKind::CouplingViolation,
                    severity: Severity::Warning,
                    message: format!(
                        "{} has {} cross-layer dependencies (threshold {})",
                        file, count, self.max_cross_layer_edges
                    ),
                });
            }
        }

        report.violations.sort_by(|a, b| {
            (&a.source, &a.target, a.rule).cmp(&(&b.source, &b.target, b.rule))
        });
        report
    }
}
