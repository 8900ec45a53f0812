//! Subcommand handlers

pub mod check;
pub mod run;

pub use check::handle_check;
pub use run::{handle_run, replay, ReplayReport};
