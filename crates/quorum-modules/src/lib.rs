//! # Quorum Modules - Layer 2: Bypass Modules
//!
//! Narrow conditions under which a single owner may apply an effect without
//! collecting threshold approvals.
//!
//! ## What Belongs Here
//!
//! - `Whitelist`: pre-approved targets with optional per-call caps
//! - `DailyLimit`: rolling budget for plain transfers, lazily reset
//!
//! ## What Does NOT Belong Here
//!
//! - Applying the effect or logging the bypass (quorum-engine)
//! - Editing module configuration outside governance transactions

#![forbid(unsafe_code)]

/// Rolling daily spending budget
pub mod daily_limit;

/// Whitelisted call targets
pub mod whitelist;

pub use daily_limit::{DailyLimit, SpendReceipt};
pub use whitelist::{Whitelist, WhitelistEntry};
