use std::convert::Infallible;
use std::path::PathBuf;
use std::time::Duration;

use promptfit_core::{ExtractionError, Violation};
use promptfit_text::TokenizerError;
use thiserror::Error;

/// Errors from running a model subprocess.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The model command line was empty.
    #[error("Model command is empty")]
    EmptyCommand,

    /// The program could not be located.
    #[error("Model executable not found: {0}")]
    ExecutableNotFound(String),

    /// Spawning or talking to the child failed.
    #[error("Failed to run model process at stage '{stage}': {source}")]
    SpawnFailed {
        /// What was being attempted.
        stage: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The child did not finish in time and was killed.
    #[error("Model process timed out after {elapsed:?} (PID: {pid})")]
    Timeout {
        /// Time spent before giving up.
        elapsed: Duration,
        /// Child process id.
        pid: u32,
    },

    /// The child exited unsuccessfully.
    #[error("Model process exited with code {exit_code} (PID: {pid}, elapsed: {elapsed:?})\nSTDERR: {stderr}")]
    NonZeroExit {
        /// Exit code, `-1` when killed by a signal.
        exit_code: i32,
        /// Child process id.
        pid: u32,
        /// Run time.
        elapsed: Duration,
        /// Captured standard error.
        stderr: String,
    },

    /// The child wrote more than the capture limit.
    #[error("Output truncated: captured {captured_bytes} bytes (limit: {limit_bytes} bytes)")]
    OutputTruncated {
        /// Bytes seen when the limit was crossed.
        captured_bytes: usize,
        /// Configured limit.
        limit_bytes: usize,
    },

    /// Child process stdin was not piped.
    #[error("Child process stdin was not captured")]
    NoStdin,

    /// Child process stdout was not piped.
    #[error("Child process stdout was not captured")]
    NoStdout,

    /// Child process stderr was not piped.
    #[error("Child process stderr was not captured")]
    NoStderr,

    /// The child exited before its PID could be read.
    #[error("Could not get PID from child process")]
    NoPid,
}

/// Errors surfaced by the `promptfit` binary.
#[derive(Debug, Error)]
pub enum CliError {
    /// An input file could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Standard input could not be read.
    #[error("Failed to read stdin: {0}")]
    Stdin(#[source] std::io::Error),

    /// A schema file is not a valid schema description.
    #[error("Invalid schema in {}: {source}", .path.display())]
    Schema {
        /// Schema file.
        path: PathBuf,
        /// Deserialization error.
        #[source]
        source: serde_json::Error,
    },

    /// A tokenizer could not be built.
    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),

    /// The model command could not be prepared.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Extraction through the model failed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError<CommandError>),

    /// A saved response failed parsing or validation.
    #[error(transparent)]
    Response(#[from] ExtractionError<Infallible>),

    /// Output could not be rendered.
    #[error("Failed to render output: {0}")]
    Render(#[source] serde_json::Error),
}

impl CliError {
    /// Schema violations carried by this error, if any.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Extraction(e) => e.violations(),
            Self::Response(e) => e.violations(),
            _ => &[],
        }
    }
}
