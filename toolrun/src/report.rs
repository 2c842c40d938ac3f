//! Turning failures into build stops.
//!
//! Every fatal condition on the task path, whichever component noticed it,
//! goes through [`FailureReporter::report`]. That gives one message format in
//! the build log and one error type ([`BuildStop`]) for the caller to stop
//! its pipeline on. The reporter never retries and never exits the process.

use thiserror::Error;
use tracing::error;

use crate::core::types::{ExecutionResult, TaskKind};
use crate::error::{ConfigError, DispatchError, ExecError};
use crate::io::sink::LogSink;

/// Why a task stopped.
#[derive(Debug, Error)]
pub enum Failure {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The tool ran and exited non-zero.
    #[error("exited with code {}", .code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    Exit { code: Option<i32>, log: String },

    #[error(transparent)]
    Exec(#[from] ExecError),

    /// A variant could not prepare its input (e.g. manifest synthesis).
    #[error("{0:#}")]
    Preparation(anyhow::Error),
}

/// Coarse classification used for exit codes and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Configuration,
    Dispatch,
    Execution,
    Launch,
    Interrupted,
    Preparation,
}

impl Failure {
    pub fn kind(&self) -> FailureKind {
        match self {
            Failure::Config(_) => FailureKind::Configuration,
            Failure::Dispatch(_) => FailureKind::Dispatch,
            Failure::Exit { .. } => FailureKind::Execution,
            Failure::Exec(ExecError::Launch { .. }) => FailureKind::Launch,
            Failure::Exec(ExecError::TimedOut { .. } | ExecError::Cancelled { .. }) => {
                FailureKind::Interrupted
            }
            Failure::Exec(ExecError::Io { .. }) => FailureKind::Execution,
            Failure::Preparation(_) => FailureKind::Preparation,
        }
    }
}

/// Build-stopping error handed back to the caller.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct BuildStop {
    pub task: TaskKind,
    pub message: String,
    pub failure: Failure,
}

impl BuildStop {
    pub fn kind(&self) -> FailureKind {
        self.failure.kind()
    }

    /// Tool output captured before the failure, when there is any.
    pub fn log(&self) -> Option<&str> {
        match &self.failure {
            Failure::Exit { log, .. } => Some(log),
            Failure::Exec(err) => err.log(),
            _ => None,
        }
    }
}

/// Single chokepoint for fatal task conditions.
#[derive(Clone, Copy)]
pub struct FailureReporter<'a> {
    sink: &'a dyn LogSink,
}

impl<'a> FailureReporter<'a> {
    pub fn new(sink: &'a dyn LogSink) -> Self {
        Self { sink }
    }

    /// Log `failure` and wrap it into a [`BuildStop`].
    pub fn report(&self, task: TaskKind, failure: impl Into<Failure>) -> BuildStop {
        let failure = failure.into();
        let message = match &failure {
            Failure::Exit { .. } => format!(
                "{} failed, see the build log for more details.",
                task.display_name()
            ),
            other => other.to_string(),
        };
        self.sink.line(&message);
        error!(task = %task, kind = ?failure.kind(), "{message}");
        BuildStop {
            task,
            message,
            failure,
        }
    }

    /// Pass a successful result through; report anything else.
    pub fn check(&self, task: TaskKind, result: ExecutionResult) -> Result<ExecutionResult, BuildStop> {
        if result.success {
            return Ok(result);
        }
        Err(self.report(
            task,
            Failure::Exit {
                code: result.exit_code,
                log: result.log,
            },
        ))
    }
}
