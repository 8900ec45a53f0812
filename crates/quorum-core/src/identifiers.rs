//! Identifier types used across the engine
//!
//! `Address` is the identity of owners, guardians and call targets.
//! `TransactionId` and `RecoveryId` are content-derived digests minted from
//! the operation being proposed and a monotonically increasing nonce.

use crate::{hash::Hash32, QuorumError, QuorumResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length of an address in bytes
pub const ADDRESS_LEN: usize = 20;

/// Address-like identity for owners, guardians and call targets.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// The null identity. Never a valid owner, guardian or whitelist entry.
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    /// Create from raw bytes
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw address bytes
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Whether this is the null identity
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }

    /// Parse a hex address, with or without `0x`
    pub fn from_hex(s: &str) -> QuorumResult<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| QuorumError::validation(format!("malformed address {s:?}: {e}")))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = QuorumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_hex(s)
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Identifier of a proposed transaction or a bypass execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub Hash32);

impl TransactionId {
    /// Derive from the encoded operation and the registry nonce.
    pub fn derive(encoded_operation: &[u8], nonce: u64) -> Self {
        let mut h = crate::hash::hasher();
        h.update(b"quorum/tx/v1")
            .update(encoded_operation)
            .update(&nonce.to_le_bytes());
        Self(h.finalize())
    }

    /// Underlying digest
    pub fn as_hash(&self) -> &Hash32 {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{}", &self.0.to_hex()[..16])
    }
}

/// Identifier of a guardian recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecoveryId(pub Hash32);

impl RecoveryId {
    /// Derive from the encoded replacement owner set and the recovery nonce.
    pub fn derive(encoded_request: &[u8], nonce: u64) -> Self {
        let mut h = crate::hash::hasher();
        h.update(b"quorum/recovery/v1")
            .update(encoded_request)
            .update(&nonce.to_le_bytes());
        Self(h.finalize())
    }

    /// Underlying digest
    pub fn as_hash(&self) -> &Hash32 {
        &self.0
    }
}

impl fmt::Display for RecoveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "recovery-{}", &self.0.to_hex()[..16])
    }
}
