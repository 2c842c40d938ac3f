//! MSBuild: build a solution or project file.

use std::fmt::Display;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::grammar::{ArgSpec, FlagStyle, Grammar, Position, Quoting};
use crate::core::types::{CommandDescriptor, ExecutionResult, TaskKind};
use crate::error::ConfigError;
use crate::io::config::Registry;
use crate::io::executor::CommandExecutor;
use crate::io::sink::LogSink;
use crate::report::BuildStop;
use crate::task::ToolTask;

pub use super::COMMAND;

pub const FRAMEWORK: &str = "framework";
pub const SOLUTION: &str = "solution";
pub const VERBOSITY: &str = "verbosity";
pub const LOGGER_MODULE: &str = "logger_module";
pub const NO_LOGO: &str = "no_logo";
pub const PROPERTIES: &str = "properties";
pub const OTHER_SWITCHES: &str = "other_switches";
pub const TARGETS: &str = "targets";

const DEFAULT_WINDOWS_DIR: &str = "C:/Windows";

pub static GRAMMAR: Grammar = Grammar {
    tool: "msbuild",
    version: "4.0",
    verb: &[],
    args: &[
        ArgSpec::positional(SOLUTION, Position::Leading)
            .quoted(Quoting::Always)
            .required("solution cannot be nil"),
        ArgSpec::valued(VERBOSITY, "/verbosity", FlagStyle::Joined(":")),
        ArgSpec::valued(LOGGER_MODULE, "/logger", FlagStyle::Joined(":")),
        ArgSpec::switch(NO_LOGO, "/nologo"),
        ArgSpec::properties(PROPERTIES, "/p:", "=").quoted(Quoting::Always),
        ArgSpec::properties(OTHER_SWITCHES, "/", ":").quoted(Quoting::Always),
        ArgSpec::valued(TARGETS, "/target", FlagStyle::Joined(":")).joined_by(";"),
    ],
};

/// .NET framework whose bundled `MSBuild.exe` should be used.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    Net20,
    Net35,
    Net40,
}

impl Framework {
    pub fn as_str(self) -> &'static str {
        match self {
            Framework::Net20 => "net20",
            Framework::Net35 => "net35",
            Framework::Net40 => "net40",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "net20" => Some(Framework::Net20),
            "net35" => Some(Framework::Net35),
            "net40" => Some(Framework::Net40),
            _ => None,
        }
    }

    /// Directory name under `Microsoft.NET/Framework`.
    pub fn install_dir(self) -> &'static str {
        match self {
            Framework::Net20 => "v2.0.50727",
            Framework::Net35 => "v3.5",
            Framework::Net40 => "v4.0.30319",
        }
    }

    pub fn msbuild_path(self, windows_dir: &str) -> String {
        format!(
            "{}/Microsoft.NET/Framework/{}/MSBuild.exe",
            windows_dir.trim_end_matches(['/', '\\']),
            self.install_dir()
        )
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Quiet,
    Minimal,
    Normal,
    Detailed,
    Diagnostic,
}

impl Verbosity {
    pub fn as_str(self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Minimal => "minimal",
            Verbosity::Normal => "normal",
            Verbosity::Detailed => "detailed",
            Verbosity::Diagnostic => "diagnostic",
        }
    }
}

/// Windows directory from `windir`/`WINDIR`, defaulting to `C:/Windows`.
pub fn windows_dir() -> String {
    std::env::var("windir")
        .or_else(|_| std::env::var("WINDIR"))
        .unwrap_or_else(|_| DEFAULT_WINDOWS_DIR.to_string())
}

#[derive(Debug, Clone)]
pub struct MsBuild {
    task: ToolTask,
    windows_dir: String,
}

impl MsBuild {
    pub fn new(registry: &Registry) -> Self {
        Self::with_windows_dir(registry, windows_dir())
    }

    /// Like [`MsBuild::new`] with an explicit Windows directory.
    pub fn with_windows_dir(registry: &Registry, windows_dir: impl Into<String>) -> Self {
        Self {
            task: ToolTask::new(TaskKind::MsBuild, &GRAMMAR, registry),
            windows_dir: windows_dir.into(),
        }
    }

    pub fn solution(&mut self, path: impl Into<String>) -> &mut Self {
        self.task.options_mut().set(SOLUTION, path.into());
        self
    }

    pub fn verbosity(&mut self, verbosity: Verbosity) -> &mut Self {
        self.task.options_mut().set(VERBOSITY, verbosity.as_str());
        self
    }

    pub fn logger_module(&mut self, logger: impl Into<String>) -> &mut Self {
        self.task.options_mut().set(LOGGER_MODULE, logger.into());
        self
    }

    pub fn no_logo(&mut self) -> &mut Self {
        self.task.options_mut().enable(NO_LOGO);
        self
    }

    /// Set a `/p:` build property. Values render through `Display`, so
    /// `true` becomes `"true"` and `3.5` becomes `"3.5"`.
    pub fn property(&mut self, key: impl Into<String>, value: impl Display) -> &mut Self {
        self.task
            .options_mut()
            .insert_entry(PROPERTIES, key, value.to_string());
        self
    }

    /// Set an arbitrary `/name:"value"` switch such as `toolsVersion`.
    pub fn other_switch(&mut self, name: impl Into<String>, value: impl Display) -> &mut Self {
        self.task
            .options_mut()
            .insert_entry(OTHER_SWITCHES, name, value.to_string());
        self
    }

    /// Replace the target list.
    pub fn targets<I, S>(&mut self, targets: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let targets: Vec<String> = targets.into_iter().map(Into::into).collect();
        self.task.options_mut().set(TARGETS, targets);
        self
    }

    /// Add one target after any already set.
    pub fn target(&mut self, target: impl Into<String>) -> &mut Self {
        self.task.options_mut().append(TARGETS, target);
        self
    }

    /// Use the `MSBuild.exe` of a specific framework, dropping any explicit command.
    pub fn use_framework(&mut self, framework: Framework) -> &mut Self {
        let options = self.task.options_mut();
        options.set(FRAMEWORK, framework.as_str());
        options.remove(COMMAND);
        self
    }

    pub fn command(&mut self, program: impl Into<String>) -> &mut Self {
        self.task.options_mut().set(COMMAND, program.into());
        self
    }

    pub fn workdir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.task.set_workdir(dir);
        self
    }

    /// Explicit command, else the selected framework's `MSBuild.exe`, else .NET 4.0.
    pub fn program(&self) -> String {
        let options = self.task.options();
        if let Some(command) = options.get_str(COMMAND) {
            return command.to_string();
        }
        options
            .get_str(FRAMEWORK)
            .and_then(Framework::parse)
            .unwrap_or(Framework::Net40)
            .msbuild_path(&self.windows_dir)
    }

    pub fn task(&self) -> &ToolTask {
        &self.task
    }

    pub fn build_parameters(&self) -> Result<Vec<String>, ConfigError> {
        self.task.build_parameters()
    }

    pub fn descriptor(&self) -> Result<CommandDescriptor, ConfigError> {
        self.task.descriptor(self.program())
    }

    pub fn execute<E: CommandExecutor + ?Sized>(
        &mut self,
        executor: &E,
        sink: &dyn LogSink,
    ) -> Result<ExecutionResult, BuildStop> {
        let program = self.program();
        self.task.execute(program, executor, sink)
    }
}
