//! Quorum CLI Library
//!
//! Configuration checking and scripted replay against an in-process vault.
//! The `quorum` binary is a thin clap front end over these handlers.

#![allow(missing_docs)]

pub mod applier;
pub mod commands;
pub mod script;

pub use applier::SimulatedApplier;
pub use script::{parse_line, parse_script, Replay, ScriptCommand, ScriptLine, StepResult};
