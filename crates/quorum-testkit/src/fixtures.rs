//! Deterministic identities, times and configurations

use quorum_core::config::{
    DailyLimitConfig, OwnersConfig, RecoveryConfig, WhitelistConfig, WhitelistEntryConfig,
};
use quorum_core::{Address, Timestamp, VaultConfig};

/// One hour in milliseconds
pub const HOUR_MS: u64 = 60 * 60 * 1000;

/// One day in milliseconds
pub const DAY_MS: u64 = 24 * HOUR_MS;

/// Deterministic non-null address distinguished by `n`
pub fn address(n: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = 0x0a;
    bytes[19] = n;
    Address::new(bytes)
}

/// Owners A, B, C
pub fn owners_abc() -> [Address; 3] {
    [address(0xa1), address(0xa2), address(0xa3)]
}

/// Guardians G1, G2, G3
pub fn guardians_g123() -> [Address; 3] {
    [address(0xc1), address(0xc2), address(0xc3)]
}

/// Call target X
pub fn target_x() -> Address {
    address(0x58)
}

/// Whitelisted target W
pub fn target_w() -> Address {
    address(0x57)
}

/// A fixed, non-zero starting time
pub fn t0() -> Timestamp {
    Timestamp::from_millis(1_700_000_000_000)
}

/// `base` plus `hours`
pub fn plus_hours(base: Timestamp, hours: u64) -> Timestamp {
    Timestamp::from_millis(base.as_millis() + hours * HOUR_MS)
}

/// Owners A, B, C with threshold 2 and nothing else configured
pub fn basic_config() -> VaultConfig {
    VaultConfig {
        owners: OwnersConfig {
            addresses: owners_abc().to_vec(),
            threshold: 2,
            proposer_auto_approves: false,
        },
        whitelist: WhitelistConfig::default(),
        daily_limit: DailyLimitConfig::default(),
        recovery: RecoveryConfig::default(),
    }
}

/// `basic_config` plus W capped at 5, a daily limit of 100 and guardians
/// G1..G3 with threshold 2 and a one-day period
pub fn full_config() -> VaultConfig {
    let mut config = basic_config();
    config.whitelist.entries = vec![WhitelistEntryConfig {
        address: target_w(),
        cap: Some(5),
    }];
    config.daily_limit.limit = 100;
    config.recovery = RecoveryConfig {
        guardians: guardians_g123().to_vec(),
        threshold: 2,
        period_secs: DAY_MS / 1000,
    };
    config
}
