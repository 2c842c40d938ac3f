//! A single-use external tool invocation.
//!
//! [`ToolTask`] composes the pieces every wrapper needs: an owned
//! [`OptionStore`] seeded from the [`Registry`], a [`ParamBuilder`] bound to
//! the tool's grammar, and an executor supplied when the task runs. Wrappers
//! in [`crate::tools`] add named setters on top.

use std::path::PathBuf;

use tracing::{debug, instrument};

use crate::core::grammar::Grammar;
use crate::core::options::OptionStore;
use crate::core::params::ParamBuilder;
use crate::core::types::{CommandDescriptor, ExecutionResult, TaskKind, TaskState};
use crate::error::ConfigError;
use crate::io::config::Registry;
use crate::io::executor::CommandExecutor;
use crate::io::sink::LogSink;
use crate::report::{BuildStop, FailureReporter};

#[derive(Debug, Clone)]
pub struct ToolTask {
    kind: TaskKind,
    options: OptionStore,
    builder: ParamBuilder,
    workdir: Option<PathBuf>,
    state: TaskState,
}

impl ToolTask {
    /// Create a task with the registry's defaults for `kind` already merged in.
    pub fn new(kind: TaskKind, grammar: &'static Grammar, registry: &Registry) -> Self {
        let mut options = OptionStore::new();
        options.merge_defaults(&registry.defaults_for(kind));
        Self {
            kind,
            options,
            builder: ParamBuilder::new(grammar),
            workdir: None,
            state: TaskState::Unconfigured,
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn options(&self) -> &OptionStore {
        &self.options
    }

    /// Mutable access to the options. Marks the task as configured.
    pub fn options_mut(&mut self) -> &mut OptionStore {
        if self.state == TaskState::Unconfigured {
            self.state = TaskState::Configured;
        }
        &mut self.options
    }

    pub fn set_workdir(&mut self, workdir: impl Into<PathBuf>) {
        self.workdir = Some(workdir.into());
    }

    /// Record that a variant was chosen for this task's input.
    pub fn mark_dispatched(&mut self) {
        if matches!(self.state, TaskState::Unconfigured | TaskState::Configured) {
            self.state = TaskState::Dispatched;
        }
    }

    /// String option value, or `fallback` when unset.
    pub fn option_or(&self, option: &str, fallback: &str) -> String {
        self.options
            .get_str(option)
            .unwrap_or(fallback)
            .to_string()
    }

    pub fn build_parameters(&self) -> Result<Vec<String>, ConfigError> {
        self.builder.build(&self.options)
    }

    pub fn descriptor(&self, program: impl Into<String>) -> Result<CommandDescriptor, ConfigError> {
        Ok(CommandDescriptor {
            task: self.kind,
            program: program.into(),
            args: self.build_parameters()?,
            workdir: self.workdir.clone(),
        })
    }

    /// Render, run and check the command. A task runs at most once.
    ///
    /// Configuration problems are reported before anything is spawned.
    #[instrument(skip_all, fields(task = %self.kind))]
    pub fn execute<E: CommandExecutor + ?Sized>(
        &mut self,
        program: impl Into<String>,
        executor: &E,
        sink: &dyn LogSink,
    ) -> Result<ExecutionResult, BuildStop> {
        let kind = self.kind;
        let reporter = FailureReporter::new(sink);
        if self.state == TaskState::Executing || self.state.is_finished() {
            return Err(reporter.report(
                kind,
                ConfigError::AlreadyExecuted {
                    task: kind.name().to_string(),
                },
            ));
        }
        self.state = TaskState::Executing;

        let outcome = self
            .descriptor(program)
            .map_err(|err| reporter.report(kind, err))
            .and_then(|descriptor| {
                executor
                    .run(&descriptor, sink)
                    .map_err(|err| reporter.report(kind, err))
            })
            .and_then(|result| reporter.check(kind, result));

        self.state = if outcome.is_ok() {
            TaskState::Succeeded
        } else {
            TaskState::Failed
        };
        debug!(state = ?self.state, "task finished");
        outcome
    }
}
