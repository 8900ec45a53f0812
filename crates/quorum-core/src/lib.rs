//! # Quorum Core - Layer 1: Shared Vocabulary
//!
//! Foundational types for the Quorum multi-party authorization engine.
//!
//! ## What Belongs Here
//!
//! - Identities (`Address`) and content-derived ids (`TransactionId`, `RecoveryId`)
//! - Host-injected time (`Timestamp`)
//! - Proposal payloads (`Operation`, `Call`, `GovernanceOp`)
//! - Transition records (`VaultEvent`) and their sinks
//! - The external effect interface (`EffectApplier`)
//! - The unified error type and configuration loading
//!
//! ## What Does NOT Belong Here
//!
//! - Owner, approval or recovery state machines (Layer 2 crates)
//! - Locking and composition of those state machines (`quorum-engine`)

#![forbid(unsafe_code)]

/// Unified error handling
pub mod errors;

/// Content hashing for identifiers
pub mod hash;

/// Address and id types
pub mod identifiers;

/// Host-supplied time
pub mod time;

/// Value amounts and their serde form
pub mod amount;

/// Transaction payloads
pub mod operation;

/// Transition records and sinks
pub mod events;

/// External effect interface
pub mod effects;

/// TOML configuration
pub mod config;

pub use config::{ConfigValidation, VaultConfig};
pub use effects::{EffectApplier, EffectError, EffectReceipt};
pub use errors::{QuorumError, QuorumResult};
pub use events::{
    EventKind, EventSink, EventSubject, InMemoryEventLog, TracingEventSink, VaultEvent,
};
pub use hash::Hash32;
pub use identifiers::{Address, RecoveryId, TransactionId};
pub use operation::{Amount, Call, GovernanceDomain, GovernanceOp, Operation};
pub use time::{Timestamp, DAY};
