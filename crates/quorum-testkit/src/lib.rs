//! Quorum Testing Infrastructure
//!
//! Shared fixtures for the workspace's integration tests: deterministic
//! addresses and times, ready-made configurations, a recording effect applier
//! and a harness that wires them into a `Vault`.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! quorum-testkit = { workspace = true }
//! ```
//!
//! ```rust,no_run
//! use quorum_testkit::*;
//!
//! let h = VaultHarness::basic();
//! let [a, b, c] = owners_abc();
//! let id = h.vault.propose(a, quorum_core::Call::transfer(target_x(), 10), t0()).unwrap();
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod effects;
pub mod fixtures;
pub mod harness;

pub use effects::RecordingApplier;
pub use fixtures::*;
pub use harness::VaultHarness;
