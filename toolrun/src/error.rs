//! Error types raised by the builder, dispatcher and executor.
//!
//! These are the raw conditions. Callers never see them directly on the task
//! path: [`crate::report::FailureReporter`] wraps each one into a
//! [`crate::report::BuildStop`].

use std::time::Duration;

use thiserror::Error;

/// A task was asked to run with configuration it cannot render.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{message}")]
    MissingOption { option: String, message: String },

    #[error("option `{option}` expects a {expected} value, found {found}")]
    TypeMismatch {
        option: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{task} has already been executed")]
    AlreadyExecuted { task: String },
}

/// No registered variant could be picked for an input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("no task variant accepts input {input}")]
    NoMatch { input: String },

    #[error("input {input} is accepted by more than one variant: {}", .variants.join(", "))]
    Ambiguous { input: String, variants: Vec<String> },
}

/// The external program could not be run to completion.
///
/// A non-zero exit is not an `ExecError`: it is a normal
/// [`crate::core::types::ExecutionResult`] with `success == false`.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("could not launch `{program}`: {source}")]
    Launch {
        program: String,
        source: std::io::Error,
    },

    #[error("`{program}` timed out after {}s", .timeout.as_secs())]
    TimedOut {
        program: String,
        timeout: Duration,
        log: String,
    },

    #[error("`{program}` was cancelled")]
    Cancelled { program: String, log: String },

    #[error("i/o error while running `{program}`: {source}")]
    Io {
        program: String,
        source: std::io::Error,
    },
}

impl ExecError {
    /// Output captured before the process was stopped, if any.
    pub fn log(&self) -> Option<&str> {
        match self {
            ExecError::TimedOut { log, .. } | ExecError::Cancelled { log, .. } => Some(log),
            ExecError::Launch { .. } | ExecError::Io { .. } => None,
        }
    }
}
