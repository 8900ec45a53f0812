//! Whitelist bypass module
//!
//! A whitelisted target may receive calls from a single owner without
//! threshold approval, as long as the value stays within the entry's cap.
//! The whitelist is only queried here; edits arrive as governance operations
//! executed through the approval pipeline.

use indexmap::IndexMap;
use quorum_core::{Address, Amount, QuorumError, QuorumResult};
use serde::{Deserialize, Serialize};

/// Whitelisted target with an optional per-call cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    /// Target address
    pub address: Address,
    /// Maximum value per bypass call, `None` for unlimited
    #[serde(default, with = "quorum_core::amount::option")]
    pub cap: Option<Amount>,
}

impl WhitelistEntry {
    /// Whether `value` fits under the cap
    pub fn permits(&self, value: Amount) -> bool {
        self.cap.map_or(true, |cap| value <= cap)
    }
}

/// Set of whitelisted targets in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Whitelist {
    entries: IndexMap<Address, WhitelistEntry>,
}

impl Whitelist {
    /// Create an empty whitelist
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from initial entries, rejecting null and duplicate targets
    pub fn from_entries(
        entries: impl IntoIterator<Item = (Address, Option<Amount>)>,
    ) -> QuorumResult<Self> {
        let mut whitelist = Self::new();
        for (address, cap) in entries {
            whitelist.add_entry(address, cap)?;
        }
        Ok(whitelist)
    }

    /// `to` is whitelisted and `value` is within its cap
    pub fn can_bypass(&self, to: &Address, value: Amount) -> bool {
        self.entries
            .get(to)
            .is_some_and(|entry| entry.permits(value))
    }

    /// Reason a bypass to `to` with `value` would be refused, if any
    pub fn refusal(&self, to: &Address, value: Amount) -> Option<String> {
        match self.entries.get(to) {
            None => Some(format!("{to} is not whitelisted")),
            Some(entry) if !entry.permits(value) => Some(format!(
                "value {value} exceeds whitelist cap {} for {to}",
                entry.cap.unwrap_or_default()
            )),
            Some(_) => None,
        }
    }

    /// Entry for `address`
    pub fn get(&self, address: &Address) -> Option<&WhitelistEntry> {
        self.entries.get(address)
    }

    /// Whether `address` is whitelisted
    pub fn contains(&self, address: &Address) -> bool {
        self.entries.contains_key(address)
    }

    /// Entries in insertion order
    pub fn entries(&self) -> impl Iterator<Item = &WhitelistEntry> {
        self.entries.values()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is whitelisted
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whitelist a new target.
    pub fn add_entry(&mut self, address: Address, cap: Option<Amount>) -> QuorumResult<()> {
        if address.is_zero() {
            return Err(QuorumError::validation("null address cannot be whitelisted"));
        }
        if self.entries.contains_key(&address) {
            return Err(QuorumError::validation(format!(
                "{address} is already whitelisted"
            )));
        }
        self.entries.insert(address, WhitelistEntry { address, cap });
        Ok(())
    }

    /// Remove a whitelisted target.
    pub fn remove_entry(&mut self, address: &Address) -> QuorumResult<WhitelistEntry> {
        self.entries
            .shift_remove(address)
            .ok_or_else(|| QuorumError::validation(format!("{address} is not whitelisted")))
    }

    /// Change the cap of an existing entry.
    pub fn set_cap(&mut self, address: &Address, cap: Option<Amount>) -> QuorumResult<()> {
        let entry = self
            .entries
            .get_mut(address)
            .ok_or_else(|| QuorumError::validation(format!("{address} is not whitelisted")))?;
        entry.cap = cap;
        Ok(())
    }
}
