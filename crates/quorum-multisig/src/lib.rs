//! # Quorum Multisig - Layer 2: Approval Pipeline
//!
//! Owner set, threshold policy and the transaction approval pipeline.
//!
//! ## Architecture Constraints
//!
//! This crate depends on:
//! - **Layer 1** (quorum-core): identifiers, operations, errors
//!
//! ## What Belongs Here
//!
//! - `OwnerPolicy`: owners plus threshold, validated on every edit
//! - `Transaction`: proposal record with its own approval set
//! - `TransactionRegistry`: propose, approve, revoke, cancel and the
//!   begin/commit/abort execution protocol
//! - `ExecutionGate`: in-flight tracking against reentrant execution
//!
//! ## What Does NOT Belong Here
//!
//! - Applying effects or governance operations (quorum-engine)
//! - Bypass modules (quorum-modules) and recovery (quorum-recovery)
//!
//! ## Design Principles
//!
//! - Approvals live inside each transaction (arena + index), never in a
//!   global `(id, owner)` map
//! - Every check takes the live `OwnerPolicy`, so readiness always reflects
//!   the current threshold
//! - A failed transition leaves the registry untouched

#![forbid(unsafe_code)]

/// In-flight execution tracking
pub mod gate;

/// Owner set and threshold policy
pub mod owners;

/// Transaction registry and approval ledger
pub mod registry;

/// Transaction records
pub mod transaction;

pub use gate::ExecutionGate;
pub use owners::OwnerPolicy;
pub use registry::{ApprovalPolicy, TransactionRegistry};
pub use transaction::{Transaction, TransactionStatus};
