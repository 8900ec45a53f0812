//! Vault wired to recording collaborators

use crate::effects::RecordingApplier;
use quorum_core::{InMemoryEventLog, VaultConfig};
use quorum_engine::Vault;
use std::sync::Arc;

/// A vault plus handles on its effect layer and event log
pub struct VaultHarness {
    /// Vault under test
    pub vault: Arc<Vault>,
    /// Records every applied call
    pub effects: Arc<RecordingApplier>,
    /// Records every published event
    pub events: Arc<InMemoryEventLog>,
}

impl VaultHarness {
    /// Build from configuration; panics on invalid config
    pub fn new(config: &VaultConfig) -> Self {
        let effects = Arc::new(RecordingApplier::new());
        let events = Arc::new(InMemoryEventLog::new());
        let vault = Vault::from_config(config, effects.clone(), events.clone())
            .expect("test configuration must be valid");
        Self {
            vault: Arc::new(vault),
            effects,
            events,
        }
    }

    /// Owners A, B, C, threshold 2
    pub fn basic() -> Self {
        Self::new(&crate::fixtures::basic_config())
    }

    /// Every module configured
    pub fn full() -> Self {
        Self::new(&crate::fixtures::full_config())
    }

    /// Same as `new` with proposer auto-approval switched on or off
    pub fn with_auto_approval(config: &VaultConfig, auto: bool) -> Self {
        let mut config = config.clone();
        config.owners.proposer_auto_approves = auto;
        Self::new(&config)
    }
}
