//! Library half of the `promptfit` binary.
//!
//! Exposes the subprocess model adapter and the subcommand bodies so they
//! can be reused and tested without going through argument parsing.

/// A `LanguageModel` that shells out to an external program.
pub mod command;
/// Subcommand implementations.
pub mod commands;
/// Error types for the binary.
pub mod errors;

pub use command::{CommandModel, CommandModelConfig, RunResult};
pub use commands::TokenizerKind;
pub use errors::{CliError, CommandError};
