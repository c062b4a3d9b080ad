//! Capability snapshot supplied by the licensing collaborator
//!
//! Components read limits and feature flags from [`TierCapabilities`]; none
//! of them branch on a tier name.

use serde::{Deserialize, Serialize};

/// Licensing tier, used only to pick a default capability table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Community,
    Pro,
    Enterprise,
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "community" | "free" => Ok(Tier::Community),
            "pro" => Ok(Tier::Pro),
            "enterprise" => Ok(Tier::Enterprise),
            other => Err(format!("unknown tier: {}", other)),
        }
    }
}

/// The two analysis tools this engine serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    SymbolDependencies,
    CallGraph,
}

/// Immutable for the duration of one request. `None` limits are unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCapabilities {
    pub max_depth: Option<usize>,
    pub max_files: Option<usize>,
    pub max_nodes: Option<usize>,
    pub max_edges: Option<usize>,
    #[serde(default)]
    pub advanced_resolution: bool,
    #[serde(default)]
    pub coupling_analysis: bool,
    #[serde(default)]
    pub enterprise_metrics: bool,
    #[serde(default)]
    pub architectural_rules: bool,
}

impl TierCapabilities {
    /// Built-in capability table.
    pub fn defaults_for(tool: Tool, tier: Tier) -> Self {
        let max_depth = match (tool, tier) {
            (Tool::SymbolDependencies, Tier::Community) => Some(1),
            (Tool::SymbolDependencies, Tier::Pro) => Some(5),
            (Tool::CallGraph, Tier::Community) => Some(3),
            (Tool::CallGraph, Tier::Pro) => Some(50),
            (_, Tier::Enterprise) => None,
        };
        let (max_files, max_nodes, max_edges) = match tier {
            Tier::Community => (Some(100), Some(50), Some(200)),
            Tier::Pro => (Some(1000), Some(500), Some(2000)),
            Tier::Enterprise => (None, None, None),
        };
        TierCapabilities {
            max_depth,
            max_files,
            max_nodes,
            max_edges,
            advanced_resolution: tier != Tier::Community,
            coupling_analysis: tier != Tier::Community,
            enterprise_metrics: tier == Tier::Enterprise,
            architectural_rules: tier == Tier::Enterprise,
        }
    }

    /// No limits, every feature on.
    pub fn unrestricted() -> Self {
        TierCapabilities {
            max_depth: None,
            max_files: None,
            max_nodes: None,
            max_edges: None,
            advanced_resolution: true,
            coupling_analysis: true,
            enterprise_metrics: true,
            architectural_rules: true,
        }
    }

    /// Clamp a caller-requested depth to the capability ceiling.
    pub fn effective_depth(&self, requested: Option<usize>) -> Option<usize> {
        match (requested, self.max_depth) {
            (Some(r), Some(cap)) => Some(r.min(cap)),
            (Some(r), None) => Some(r),
            (None, cap) => cap,
        }
    }
}

/// Resolves the capability snapshot for a request.
pub trait CapabilityResolver: Send + Sync {
    fn capabilities_for(&self, tool: Tool, tier: Tier) -> TierCapabilities;
}

/// Resolver backed by [`TierCapabilities::defaults_for`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticCapabilities;

impl CapabilityResolver for StaticCapabilities {
    fn capabilities_for(&self, tool: Tool, tier: Tier) -> TierCapabilities {
        TierCapabilities::defaults_for(tool, tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn community_dependency_depth_is_one() {
        let caps = TierCapabilities::defaults_for(Tool::SymbolDependencies, Tier::Community);
        assert_eq!(caps.max_depth, Some(1));
        assert!(!caps.advanced_resolution);
        assert!(!caps.enterprise_metrics);
    }

    #[test]
    fn enterprise_is_unbounded_with_all_features() {
        let caps = TierCapabilities::defaults_for(Tool::CallGraph, Tier::Enterprise);
        assert_eq!(caps.max_depth, None);
        assert_eq!(caps.max_nodes, None);
        assert!(caps.enterprise_metrics && caps.architectural_rules);
    }

    #[test]
    fn override_cannot_exceed_ceiling() {
        let caps = TierCapabilities::defaults_for(Tool::SymbolDependencies, Tier::Pro);
        assert_eq!(caps.effective_depth(Some(9)), Some(5));
        assert_eq!(caps.effective_depth(Some(2)), Some(2));
        assert_eq!(caps.effective_depth(None), Some(5));
    }

    #[test]
    fn tier_parses_case_insensitively() {
        assert_eq!("PRO".parse::<Tier>(), Ok(Tier::Pro));
        assert!("gold".parse::<Tier>().is_err());
    }
}
