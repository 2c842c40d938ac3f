//! Shared types passed between the builder, executor and reporter.
//!
//! These types are plain data: no I/O, no interior mutability.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The kinds of task this crate knows how to configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    MsBuild,
    NugetUpdate,
    NugetPack,
}

impl TaskKind {
    /// Short identifier used in diagnostics and config section names.
    pub fn name(self) -> &'static str {
        match self {
            TaskKind::MsBuild => "msbuild",
            TaskKind::NugetUpdate => "nugetupdate",
            TaskKind::NugetPack => "nugetpack",
        }
    }

    /// Name shown in the "failed, see the build log" message.
    pub fn display_name(self) -> &'static str {
        match self {
            TaskKind::MsBuild => "MSBuild",
            TaskKind::NugetUpdate => "NuGet Update",
            TaskKind::NugetPack => "NuGet Pack",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A fully rendered external command.
///
/// Arguments are final: the executor passes them through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandDescriptor {
    pub task: TaskKind,
    pub program: String,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,
}

impl CommandDescriptor {
    /// `"program" arg1 arg2`, as written to the build log before launch.
    pub fn command_line(&self) -> String {
        let mut line = format!("\"{}\"", self.program);
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Outcome of one external process that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// `true` exactly when the process exited with code 0.
    pub success: bool,
    /// Combined stdout/stderr as captured (possibly truncated).
    pub log: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ExecutionResult {
    pub fn from_exit(exit_code: Option<i32>, log: String) -> Self {
        Self {
            success: exit_code == Some(0),
            log,
            exit_code,
        }
    }
}

/// Lifecycle of one task instance. There is no way back to `Configured`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Unconfigured,
    Configured,
    Dispatched,
    Executing,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn is_finished(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_exit_code_only() {
        let ok = ExecutionResult::from_exit(Some(0), "error: not really".to_string());
        assert!(ok.success);
        let failed = ExecutionResult::from_exit(Some(1), "all good".to_string());
        assert!(!failed.success);
        let killed = ExecutionResult::from_exit(None, String::new());
        assert!(!killed.success);
    }

    #[test]
    fn command_line_quotes_program_only() {
        let descriptor = CommandDescriptor {
            task: TaskKind::NugetUpdate,
            program: "C:/tools/nuget.exe".to_string(),
            args: vec!["update".to_string(), "\"pkg.nuspec\"".to_string()],
            workdir: None,
        };
        assert_eq!(
            descriptor.command_line(),
            "\"C:/tools/nuget.exe\" update \"pkg.nuspec\""
        );
    }
}
