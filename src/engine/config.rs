//! Engine configuration options.

/// Engine configuration. Module parameters live in [`crate::config::Params`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Chains whose id contains this run the periodic cleanup every minute
    /// instead of every day. Empty disables the check.
    pub integration_net_chain_id: String,
    /// Log every emitted event at debug level.
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            integration_net_chain_id: "coinexdex-test".to_string(),
            verbose: false,
        }
    }
}

impl EngineConfig {
    pub fn is_integration_net(&self, chain_id: &str) -> bool {
        !self.integration_net_chain_id.is_empty() && chain_id.contains(&self.integration_net_chain_id)
    }
}
