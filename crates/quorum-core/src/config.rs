//! Vault configuration
//!
//! Initial owners, bypass modules and guardians are read from TOML:
//!
//! ```toml
//! [owners]
//! addresses = ["0x00000000000000000000000000000000000000a1", "0x00000000000000000000000000000000000000a2"]
//! threshold = 2
//! proposer_auto_approves = false
//!
//! [whitelist]
//! entries = [{ address = "0x00000000000000000000000000000000000000f1", cap = 5 }]
//!
//! [daily_limit]
//! limit = 100
//!
//! [recovery]
//! guardians = ["0x00000000000000000000000000000000000000c1"]
//! threshold = 1
//! period_secs = 86400
//! ```
//!
//! After construction, every one of these values changes only through
//! governance transactions.

use crate::identifiers::Address;
use crate::operation::Amount;
use crate::{QuorumError, QuorumResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Default recovery time lock in seconds (one day)
pub const DEFAULT_RECOVERY_PERIOD_SECS: u64 = 24 * 60 * 60;

/// Default recovery time lock in milliseconds
pub const DEFAULT_RECOVERY_PERIOD_MS: u64 = DEFAULT_RECOVERY_PERIOD_SECS * 1000;

/// Trait for configuration validation
pub trait ConfigValidation {
    /// Validate this configuration
    fn validate(&self) -> QuorumResult<()>;
}

/// Complete vault configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Owner set and approval policy
    pub owners: OwnersConfig,
    /// Whitelist bypass module
    #[serde(default)]
    pub whitelist: WhitelistConfig,
    /// Daily-limit bypass module
    #[serde(default)]
    pub daily_limit: DailyLimitConfig,
    /// Guardian recovery
    #[serde(default)]
    pub recovery: RecoveryConfig,
}

/// Owner set and approval policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnersConfig {
    /// Initial owners
    pub addresses: Vec<Address>,
    /// Approvals required to execute
    pub threshold: u16,
    /// Count the proposer as the first approver
    #[serde(default)]
    pub proposer_auto_approves: bool,
}

/// One whitelisted target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntryConfig {
    /// Target address
    pub address: Address,
    /// Per-call value cap, absent for unlimited
    #[serde(default)]
    pub cap: Option<u64>,
}

/// Whitelist bypass module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistConfig {
    /// Initially whitelisted targets
    #[serde(default)]
    pub entries: Vec<WhitelistEntryConfig>,
}

/// Daily-limit bypass module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyLimitConfig {
    /// Budget per rolling window; zero disables the module
    #[serde(default)]
    pub limit: u64,
}

impl DailyLimitConfig {
    /// Limit widened to engine amounts
    pub fn limit(&self) -> Amount {
        Amount::from(self.limit)
    }
}

/// Guardian recovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Initial guardians; empty disables recovery
    #[serde(default)]
    pub guardians: Vec<Address>,
    /// Guardian approvals required to arm a recovery
    #[serde(default)]
    pub threshold: u16,
    /// Time lock between arming and execution
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,
}

fn default_period_secs() -> u64 {
    DEFAULT_RECOVERY_PERIOD_SECS
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            guardians: Vec::new(),
            threshold: 0,
            period_secs: DEFAULT_RECOVERY_PERIOD_SECS,
        }
    }
}

impl RecoveryConfig {
    /// Time lock as a duration
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    /// Time lock in engine milliseconds
    pub fn period_ms(&self) -> u64 {
        self.period_secs.saturating_mul(1000)
    }
}

impl VaultConfig {
    /// Parse and validate configuration text
    pub fn from_toml_str(text: &str) -> QuorumResult<Self> {
        let config: VaultConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    pub fn load_from_file(path: &Path) -> QuorumResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            QuorumError::from(e).with_context(&format!("reading {}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> QuorumResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| QuorumError::internal(format!("encoding configuration: {e}")))
    }
}

impl QuorumError {
    fn with_context(self, context: &str) -> Self {
        match self {
            QuorumError::NotFound { message } => {
                QuorumError::not_found(format!("{context}: {message}"))
            }
            other => QuorumError::internal(format!("{context}: {other}")),
        }
    }
}

/// Reject null and duplicate addresses in `addresses`.
pub fn validate_address_set(label: &str, addresses: &[Address]) -> QuorumResult<()> {
    let mut seen = HashSet::with_capacity(addresses.len());
    for address in addresses {
        if address.is_zero() {
            return Err(QuorumError::validation(format!(
                "{label}: null address is not allowed"
            )));
        }
        if !seen.insert(*address) {
            return Err(QuorumError::validation(format!(
                "{label}: duplicate address {address}"
            )));
        }
    }
    Ok(())
}

impl ConfigValidation for OwnersConfig {
    fn validate(&self) -> QuorumResult<()> {
        validate_address_set("owners", &self.addresses)?;
        if self.threshold == 0 || usize::from(self.threshold) > self.addresses.len() {
            return Err(QuorumError::validation(format!(
                "owner threshold {} must be within 1..={}",
                self.threshold,
                self.addresses.len()
            )));
        }
        Ok(())
    }
}

impl ConfigValidation for WhitelistConfig {
    fn validate(&self) -> QuorumResult<()> {
        let addresses: Vec<Address> = self.entries.iter().map(|entry| entry.address).collect();
        validate_address_set("whitelist", &addresses)
    }
}

impl ConfigValidation for RecoveryConfig {
    fn validate(&self) -> QuorumResult<()> {
        validate_address_set("guardians", &self.guardians)?;
        if self.guardians.is_empty() {
            if self.threshold != 0 {
                return Err(QuorumError::validation(
                    "guardian threshold must be 0 when no guardians are configured",
                ));
            }
            return Ok(());
        }
        if self.threshold == 0 || usize::from(self.threshold) > self.guardians.len() {
            return Err(QuorumError::validation(format!(
                "guardian threshold {} must be within 1..={}",
                self.threshold,
                self.guardians.len()
            )));
        }
        if self.period_secs == 0 {
            return Err(QuorumError::validation(
                "recovery period must be positive when guardians are configured",
            ));
        }
        Ok(())
    }
}

impl ConfigValidation for VaultConfig {
    fn validate(&self) -> QuorumResult<()> {
        self.owners.validate()?;
        self.whitelist.validate()?;
        self.recovery.validate()
    }
}
