//! Replay scripts
//!
//! A script is JSON lines, one timed command per line. Blank lines and lines
//! starting with `#` are skipped. Transactions and recoveries are named by
//! labels chosen in the script, since their ids are only known once minted:
//!
//! ```text
//! {"at": 0, "actor": "0x…a1", "cmd": "propose", "label": "pay", "operation": {"kind": "call", "to": "0x…58", "value": 10}}
//! {"at": 5, "actor": "0x…a2", "cmd": "approve", "tx": "pay"}
//! ```

use anyhow::{anyhow, bail, Context, Result};
use quorum_core::{
    Address, Call, Operation, QuorumError, QuorumResult, RecoveryId, Timestamp, TransactionId,
};
use quorum_engine::{BypassDecision, Submission, Vault};
use quorum_recovery::RecoveryPhase;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One line of a script
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScriptLine {
    /// Host time in milliseconds
    pub at: u64,
    /// Identity issuing the command
    pub actor: Address,
    /// What to do
    #[serde(flatten)]
    pub command: ScriptCommand,
}

/// Commands a script can issue
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "cmd", rename_all = "kebab-case")]
pub enum ScriptCommand {
    Propose {
        label: String,
        operation: Operation,
    },
    Approve {
        tx: String,
    },
    Revoke {
        tx: String,
    },
    Execute {
        tx: String,
    },
    Cancel {
        tx: String,
    },
    Submit {
        /// Label bound if the call ends up proposed
        #[serde(default)]
        label: Option<String>,
        call: Call,
    },
    BypassWhitelist {
        call: Call,
    },
    BypassDaily {
        call: Call,
    },
    InitiateRecovery {
        label: String,
        new_owners: Vec<Address>,
        new_threshold: u16,
    },
    ApproveRecovery {
        recovery: String,
    },
    CancelRecovery {
        recovery: String,
    },
    ExecuteRecovery {
        recovery: String,
    },
}

impl ScriptCommand {
    /// Command name as written in scripts
    pub fn name(&self) -> &'static str {
        match self {
            ScriptCommand::Propose { .. } => "propose",
            ScriptCommand::Approve { .. } => "approve",
            ScriptCommand::Revoke { .. } => "revoke",
            ScriptCommand::Execute { .. } => "execute",
            ScriptCommand::Cancel { .. } => "cancel",
            ScriptCommand::Submit { .. } => "submit",
            ScriptCommand::BypassWhitelist { .. } => "bypass-whitelist",
            ScriptCommand::BypassDaily { .. } => "bypass-daily",
            ScriptCommand::InitiateRecovery { .. } => "initiate-recovery",
            ScriptCommand::ApproveRecovery { .. } => "approve-recovery",
            ScriptCommand::CancelRecovery { .. } => "cancel-recovery",
            ScriptCommand::ExecuteRecovery { .. } => "execute-recovery",
        }
    }
}

/// Parse script text. Line numbers in errors are 1-based.
pub fn parse_script(text: &str) -> Result<Vec<(usize, ScriptLine)>> {
    let mut lines = Vec::new();
    let mut last_at = 0;
    for (index, raw) in text.lines().enumerate() {
        let number = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line: ScriptLine = serde_json::from_str(trimmed)
            .with_context(|| format!("script line {number} is not a valid command"))?;
        if line.at < last_at {
            bail!(
                "script line {number}: time {} goes backwards (previous {last_at})",
                line.at
            );
        }
        last_at = line.at;
        lines.push((number, line));
    }
    Ok(lines)
}

/// What a successful command produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StepResult {
    Proposed { id: TransactionId },
    Done,
    Bypass { decision: BypassDecision },
    Submitted { submission: Submission },
    RecoveryInitiated { id: RecoveryId },
    RecoveryPhase { id: RecoveryId, phase: RecoveryPhase },
}

/// Drives a vault from script lines, resolving labels to ids.
pub struct Replay<'a> {
    vault: &'a Vault,
    transactions: HashMap<String, TransactionId>,
    recoveries: HashMap<String, RecoveryId>,
}

impl<'a> Replay<'a> {
    pub fn new(vault: &'a Vault) -> Self {
        Self {
            vault,
            transactions: HashMap::new(),
            recoveries: HashMap::new(),
        }
    }

    /// Id bound to a transaction label
    pub fn transaction_id(&self, label: &str) -> Option<TransactionId> {
        self.transactions.get(label).copied()
    }

    /// Id bound to a recovery label
    pub fn recovery_id(&self, label: &str) -> Option<RecoveryId> {
        self.recoveries.get(label).copied()
    }

    /// Apply one line. Vault rejections come back as `Err`; an unknown or
    /// reused label is a script error and also surfaces as `Err`.
    pub fn step(&mut self, line: &ScriptLine) -> QuorumResult<StepResult> {
        let now = Timestamp::from_millis(line.at);
        let actor = line.actor;
        match &line.command {
            ScriptCommand::Propose { label, operation } => {
                self.ensure_unbound_tx(label)?;
                let id = self.vault.propose(actor, operation.clone(), now)?;
                self.transactions.insert(label.clone(), id);
                Ok(StepResult::Proposed { id })
            }
            ScriptCommand::Approve { tx } => {
                let id = self.tx(tx)?;
                self.vault.approve(actor, &id, now)?;
                Ok(StepResult::Done)
            }
            ScriptCommand::Revoke { tx } => {
                let id = self.tx(tx)?;
                self.vault.revoke(actor, &id, now)?;
                Ok(StepResult::Done)
            }
            ScriptCommand::Execute { tx } => {
                let id = self.tx(tx)?;
                self.vault.execute(actor, &id, now)?;
                Ok(StepResult::Done)
            }
            ScriptCommand::Cancel { tx } => {
                let id = self.tx(tx)?;
                self.vault.cancel(actor, &id, now)?;
                Ok(StepResult::Done)
            }
            ScriptCommand::Submit { label, call } => {
                if let Some(label) = label {
                    self.ensure_unbound_tx(label)?;
                }
                let submission = self.vault.submit(actor, call.clone(), now)?;
                if let (Some(label), Submission::Proposed { id }) = (label, &submission) {
                    self.transactions.insert(label.clone(), *id);
                }
                Ok(StepResult::Submitted { submission })
            }
            ScriptCommand::BypassWhitelist { call } => {
                let decision = self.vault.execute_whitelisted(actor, call.clone(), now)?;
                Ok(StepResult::Bypass { decision })
            }
            ScriptCommand::BypassDaily { call } => {
                let decision = self
                    .vault
                    .execute_within_daily_limit(actor, call.clone(), now)?;
                Ok(StepResult::Bypass { decision })
            }
            ScriptCommand::InitiateRecovery {
                label,
                new_owners,
                new_threshold,
            } => {
                if self.recoveries.contains_key(label) {
                    return Err(QuorumError::validation(format!(
                        "recovery label '{label}' is already bound"
                    )));
                }
                let id =
                    self.vault
                        .initiate_recovery(actor, new_owners.clone(), *new_threshold, now)?;
                self.recoveries.insert(label.clone(), id);
                Ok(StepResult::RecoveryInitiated { id })
            }
            ScriptCommand::ApproveRecovery { recovery } => {
                let id = self.recovery(recovery)?;
                self.vault.approve_recovery(actor, &id, now)?;
                let phase = self.vault.recovery_phase(&id, now)?;
                Ok(StepResult::RecoveryPhase { id, phase })
            }
            ScriptCommand::CancelRecovery { recovery } => {
                let id = self.recovery(recovery)?;
                self.vault.cancel_recovery(actor, &id, now)?;
                Ok(StepResult::Done)
            }
            ScriptCommand::ExecuteRecovery { recovery } => {
                let id = self.recovery(recovery)?;
                self.vault.execute_recovery(actor, &id, now)?;
                Ok(StepResult::Done)
            }
        }
    }

    fn tx(&self, label: &str) -> QuorumResult<TransactionId> {
        self.transaction_id(label)
            .ok_or_else(|| QuorumError::not_found(format!("no transaction labelled '{label}'")))
    }

    fn recovery(&self, label: &str) -> QuorumResult<RecoveryId> {
        self.recovery_id(label)
            .ok_or_else(|| QuorumError::not_found(format!("no recovery labelled '{label}'")))
    }

    fn ensure_unbound_tx(&self, label: &str) -> QuorumResult<()> {
        if self.transactions.contains_key(label) {
            return Err(QuorumError::validation(format!(
                "transaction label '{label}' is already bound"
            )));
        }
        Ok(())
    }
}

/// Parse a single command, for callers that assemble scripts in memory
pub fn parse_line(text: &str) -> Result<ScriptLine> {
    serde_json::from_str(text).map_err(|e| anyhow!("invalid script line: {e}"))
}
