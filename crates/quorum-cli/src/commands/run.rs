//! `quorum run`: replay a script against an in-process vault.
//!
//! Output is JSON lines. Each script line yields one `outcome` record
//! followed by the events it committed; a final `snapshot` record carries the
//! whole vault state.

use crate::applier::SimulatedApplier;
use crate::script::{parse_script, Replay, ScriptLine, StepResult};
use anyhow::{bail, Context, Result};
use quorum_core::{Address, InMemoryEventLog, VaultConfig, VaultEvent};
use quorum_engine::{Vault, VaultSnapshot};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Record<'a> {
    Outcome {
        line: usize,
        command: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        ok: Option<&'a StepResult>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<Rejection>,
    },
    Event {
        event: &'a VaultEvent,
    },
    Snapshot {
        snapshot: &'a VaultSnapshot,
    },
}

#[derive(Serialize)]
struct Rejection {
    kind: &'static str,
    message: String,
}

/// Counts from a finished replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Lines applied
    pub steps: usize,
    /// Lines the vault rejected
    pub rejected: usize,
    /// Events published
    pub events: usize,
}

pub fn handle_run(
    config_path: &Path,
    script_path: &Path,
    revert: &[Address],
    fail_fast: bool,
) -> Result<()> {
    let config = VaultConfig::load_from_file(config_path)
        .with_context(|| format!("invalid configuration {}", config_path.display()))?;
    let text = std::fs::read_to_string(script_path)
        .with_context(|| format!("reading script {}", script_path.display()))?;
    let lines = parse_script(&text)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let report = replay(&config, &lines, revert, fail_fast, &mut out)?;
    info!(
        steps = report.steps,
        rejected = report.rejected,
        events = report.events,
        "replay finished"
    );
    Ok(())
}

/// Replay `lines` against a fresh vault built from `config`, writing JSON
/// records to `out`. With `fail_fast`, the first rejection aborts the replay
/// after its outcome has been written.
pub fn replay<W: Write>(
    config: &VaultConfig,
    lines: &[(usize, ScriptLine)],
    revert: &[Address],
    fail_fast: bool,
    out: &mut W,
) -> Result<ReplayReport> {
    let effects = Arc::new(SimulatedApplier::new(revert.iter().copied()));
    let events = Arc::new(InMemoryEventLog::new());
    let vault = Vault::from_config(config, effects, events.clone())?;
    let mut replay = Replay::new(&vault);
    let mut report = ReplayReport::default();
    let mut seen = 0;

    for (number, line) in lines {
        let command = line.command.name();
        let result = replay.step(line);
        report.steps += 1;
        match &result {
            Ok(step) => emit(
                out,
                &Record::Outcome {
                    line: *number,
                    command,
                    ok: Some(step),
                    error: None,
                },
            )?,
            Err(err) => {
                report.rejected += 1;
                warn!(line = number, command, error = %err, "script step rejected");
                emit(
                    out,
                    &Record::Outcome {
                        line: *number,
                        command,
                        ok: None,
                        error: Some(Rejection {
                            kind: err.kind(),
                            message: err.to_string(),
                        }),
                    },
                )?;
            }
        }

        let fresh = events.events();
        for event in &fresh[seen..] {
            emit(out, &Record::Event { event })?;
        }
        report.events += fresh.len() - seen;
        seen = fresh.len();

        if fail_fast {
            if let Err(err) = result {
                bail!("script line {number} rejected: {err}");
            }
        }
    }

    let snapshot = vault.snapshot()?;
    emit(
        out,
        &Record::Snapshot {
            snapshot: &snapshot,
        },
    )?;
    Ok(report)
}

fn emit<W: Write>(out: &mut W, record: &Record<'_>) -> Result<()> {
    serde_json::to_writer(&mut *out, record)?;
    writeln!(out)?;
    Ok(())
}
