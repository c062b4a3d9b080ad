//! Request-scoped inputs supplied by collaborators

use relmap_core::{ArchitectureConfig, CapabilityResolver, RequestBudget, Tier, TierCapabilities, Tool};
use relmap_indexer::EngineConfig;

/// Everything one request reads besides its own parameters. Nothing in
/// here is shared with, or mutated by, other requests.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub capabilities: TierCapabilities,
    pub config: EngineConfig,
    /// Architectural rules are skipped entirely when absent.
    pub architecture: Option<ArchitectureConfig>,
    pub budget: RequestBudget,
}

impl RequestContext {
    pub fn new(capabilities: TierCapabilities) -> Self {
        RequestContext {
            capabilities,
            config: EngineConfig::default(),
            architecture: None,
            budget: RequestBudget::unbounded(),
        }
    }

    /// Snapshot the capabilities a resolver grants `tier` for `tool`.
    pub fn for_tier(resolver: &dyn CapabilityResolver, tool: Tool, tier: Tier) -> Self {
        Self::new(resolver.capabilities_for(tool, tier))
    }

    /// Use `config`; its `timeout_ms`, when set, replaces the budget.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        if config.timeout_ms.is_some() {
            self.budget = RequestBudget::from_millis(config.timeout_ms);
        }
        self.config = config;
        self
    }

    pub fn with_architecture(mut self, architecture: Option<ArchitectureConfig>) -> Self {
        self.architecture = architecture;
        self
    }

    pub fn with_budget(mut self, budget: RequestBudget) -> Self {
        self.budget = budget;
        self
    }
}
