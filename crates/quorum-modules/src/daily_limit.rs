//! Daily-limit bypass module
//!
//! A single owner may send plain transfers without threshold approval while
//! the transfers fit in the remaining daily budget. The window is re-derived
//! from `(window_start, now)` on every check: once 24h have passed since
//! `window_start`, the next check sees the full limit again and the next
//! spend starts a new window at `now`. There is no background timer.
//!
//! `spend` checks and commits in one call. Callers hold the vault lock across
//! it, so two concurrent bypasses cannot both observe the same budget.

use quorum_core::{Amount, QuorumError, QuorumResult, Timestamp, DAY};
use serde::{Deserialize, Serialize};

/// Budget state: `{limit, spent, window_start}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyLimit {
    #[serde(with = "quorum_core::amount")]
    limit: Amount,
    #[serde(with = "quorum_core::amount")]
    spent: Amount,
    window_start: Timestamp,
}

/// Proof of a committed spend, used to refund it if the effect fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a spend receipt is needed to refund a failed effect"]
pub struct SpendReceipt {
    value: Amount,
    window_start: Timestamp,
}

impl SpendReceipt {
    /// Amount committed
    pub fn value(&self) -> Amount {
        self.value
    }
}

impl DailyLimit {
    /// Fresh budget with nothing spent. A zero limit disables the module.
    pub fn new(limit: Amount) -> Self {
        Self {
            limit,
            spent: 0,
            window_start: Timestamp::EPOCH,
        }
    }

    /// Restore previously persisted state
    pub fn with_state(limit: Amount, spent: Amount, window_start: Timestamp) -> Self {
        Self {
            limit,
            spent,
            window_start,
        }
    }

    /// Budget per window
    pub fn limit(&self) -> Amount {
        self.limit
    }

    /// Spent in the stored window (not reset lazily)
    pub fn spent(&self) -> Amount {
        self.spent
    }

    /// Start of the stored window
    pub fn window_start(&self) -> Timestamp {
        self.window_start
    }

    /// Whether the module can ever allow a bypass
    pub fn is_enabled(&self) -> bool {
        self.limit > 0
    }

    /// Whether the stored window has elapsed at `now`
    pub fn window_expired(&self, now: Timestamp) -> bool {
        now.saturating_since(self.window_start) >= DAY
    }

    /// Budget left at `now`
    pub fn remaining(&self, now: Timestamp) -> Amount {
        if self.window_expired(now) {
            self.limit
        } else {
            self.limit.saturating_sub(self.spent)
        }
    }

    /// Plain transfer of `value` fits in the remaining budget.
    pub fn can_bypass(&self, value: Amount, data: &[u8], now: Timestamp) -> bool {
        self.refusal(value, data, now).is_none()
    }

    /// Reason a bypass of `value` would be refused at `now`, if any
    pub fn refusal(&self, value: Amount, data: &[u8], now: Timestamp) -> Option<String> {
        if !self.is_enabled() {
            return Some("daily limit is not configured".to_string());
        }
        if !data.is_empty() {
            return Some("calls with payload never qualify for the daily limit".to_string());
        }
        let remaining = self.remaining(now);
        if value > remaining {
            return Some(format!(
                "value {value} exceeds remaining daily budget {remaining}"
            ));
        }
        None
    }

    /// Check and commit a spend of `value` at `now`.
    pub fn spend(
        &mut self,
        value: Amount,
        data: &[u8],
        now: Timestamp,
    ) -> QuorumResult<SpendReceipt> {
        if let Some(reason) = self.refusal(value, data, now) {
            return Err(QuorumError::state(reason));
        }
        if self.window_expired(now) {
            self.window_start = now;
            self.spent = 0;
        }
        self.spent += value;
        Ok(SpendReceipt {
            value,
            window_start: self.window_start,
        })
    }

    /// Return a spend whose effect failed.
    ///
    /// A no-op if the window has since rolled over; the refunded amount no
    /// longer counts against anything.
    pub fn refund(&mut self, receipt: SpendReceipt) {
        if receipt.window_start == self.window_start {
            self.spent = self.spent.saturating_sub(receipt.value);
        }
    }

    /// Change the limit, keeping the current window and its spending
    pub fn set_limit(&mut self, limit: Amount) {
        self.limit = limit;
    }
}
