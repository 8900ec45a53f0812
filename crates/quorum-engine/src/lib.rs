//! # Quorum Engine - Layer 3: Vault Composition
//!
//! Composes the Layer 2 state machines into one `Vault` behind a single
//! critical section.
//!
//! ## Architecture Constraints
//!
//! This crate depends on:
//! - **Layer 1** (quorum-core): vocabulary, effect and event interfaces
//! - **Layer 2** (quorum-multisig, quorum-modules, quorum-recovery): the
//!   state machines being composed
//!
//! ## What Belongs Here
//!
//! - Locking: every mutating operation is indivisible
//! - Effect application with rollback on failure
//! - Governance dispatch for approved configuration edits
//! - Bypass entry points and the submission router
//! - Event staging and publication after commit
//! - Queries and snapshots
//!
//! ## What Does NOT Belong Here
//!
//! - Validation rules of the individual state machines (Layer 2)
//! - Process setup, configuration files on disk, scripting (quorum-cli)

#![forbid(unsafe_code)]

/// Governance dispatch
mod governance;

/// Serializable state view
pub mod snapshot;

/// Guarded state and bypass records
pub mod state;

/// The vault facade
pub mod vault;

pub use snapshot::VaultSnapshot;
pub use state::{BypassModule, BypassRecord};
pub use vault::{BypassDecision, Submission, Vault, VaultBuilder};
