//! `quorum check`: validate a configuration file.

use anyhow::{Context, Result};
use quorum_core::VaultConfig;
use std::fmt;
use std::path::Path;
use tracing::info;

pub fn handle_check(path: &Path) -> Result<()> {
    let config = VaultConfig::load_from_file(path)
        .with_context(|| format!("invalid configuration {}", path.display()))?;
    info!(path = %path.display(), "configuration is valid");
    print!("{}", summarize(&config)?);
    Ok(())
}

/// Human-readable summary of a validated configuration
pub fn summarize(config: &VaultConfig) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write_summary(&mut out, config)?;
    Ok(out)
}

fn write_summary(out: &mut impl fmt::Write, config: &VaultConfig) -> fmt::Result {
    let owners = &config.owners;
    let auto = if owners.proposer_auto_approves {
        ", proposer auto-approves"
    } else {
        ""
    };
    writeln!(
        out,
        "owners: {} (threshold {}{auto})",
        owners.addresses.len(),
        owners.threshold
    )?;
    for owner in &owners.addresses {
        writeln!(out, "  {owner}")?;
    }

    if config.whitelist.entries.is_empty() {
        writeln!(out, "whitelist: disabled")?;
    } else {
        writeln!(out, "whitelist: {} targets", config.whitelist.entries.len())?;
        for entry in &config.whitelist.entries {
            match entry.cap {
                Some(cap) => writeln!(out, "  {} (cap {cap})", entry.address)?,
                None => writeln!(out, "  {} (uncapped)", entry.address)?,
            }
        }
    }

    match config.daily_limit.limit {
        0 => writeln!(out, "daily limit: disabled")?,
        limit => writeln!(out, "daily limit: {limit}")?,
    }

    let recovery = &config.recovery;
    if recovery.guardians.is_empty() {
        return writeln!(out, "recovery: disabled");
    }
    writeln!(
        out,
        "recovery: {} of {} guardians, time lock {}s",
        recovery.threshold,
        recovery.guardians.len(),
        recovery.period_secs
    )?;
    for guardian in &recovery.guardians {
        writeln!(out, "  {guardian}")?;
    }
    Ok(())
}
