//! # Quorum Recovery - Layer 2: Guardian Recovery
//!
//! Guardian-approved, time-locked replacement of the owner set.
//!
//! ## Architecture Constraints
//!
//! This crate depends on:
//! - **Layer 1** (quorum-core): identifiers, time, errors
//! - **Layer 2** (quorum-multisig): `OwnerPolicy`, replaced on execution
//!
//! ## What Belongs Here
//!
//! - `GuardianConfig`: guardians, guardian threshold and time lock
//! - `Recovery`: one proposed replacement with its guardian approvals
//! - `RecoveryEngine`: initiate, approve, cancel, execute
//!
//! ## Design Principles
//!
//! - Guardians are authorized only inside this state machine
//! - The guardian threshold is captured per recovery at initiation
//! - The time lock is latched once, when approvals first reach that threshold
//! - Guardian configuration is frozen while any recovery is open

#![forbid(unsafe_code)]

/// Recovery state machine
pub mod engine;

/// Guardian set configuration
pub mod guardians;

/// Recovery records
pub mod recovery;

pub use engine::{RecoveryEngine, RecoveryProgress};
pub use guardians::GuardianConfig;
pub use recovery::{Recovery, RecoveryPhase, RecoveryStatus};
