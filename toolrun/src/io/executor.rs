//! Executor abstraction for external tool invocation.
//!
//! The [`CommandExecutor`] trait decouples tasks from process spawning. Tests
//! use scripted executors that record descriptors and return predetermined
//! results without spawning anything.

use std::process::Command;

use tracing::{debug, info, instrument, warn};

use crate::core::types::{CommandDescriptor, ExecutionResult};
use crate::error::ExecError;
use crate::io::process::{CancelToken, RunLimits, StopReason, run_streaming};
use crate::io::sink::LogSink;

/// Runs a rendered command to completion.
///
/// A non-zero exit is a successful `run` returning `success == false`. `Err`
/// means the process could not be launched or was stopped before it exited.
pub trait CommandExecutor {
    fn run(
        &self,
        descriptor: &CommandDescriptor,
        sink: &dyn LogSink,
    ) -> Result<ExecutionResult, ExecError>;
}

/// Executor that spawns real processes.
///
/// Holds only immutable settings, so one instance can serve any number of
/// sequential runs.
#[derive(Debug, Clone, Default)]
pub struct SystemExecutor {
    limits: RunLimits,
    cancel: Option<CancelToken>,
}

impl SystemExecutor {
    pub fn new(limits: RunLimits) -> Self {
        Self {
            limits,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn limits(&self) -> RunLimits {
        self.limits
    }
}

impl CommandExecutor for SystemExecutor {
    #[instrument(skip_all, fields(task = %descriptor.task, program = %descriptor.program))]
    fn run(
        &self,
        descriptor: &CommandDescriptor,
        sink: &dyn LogSink,
    ) -> Result<ExecutionResult, ExecError> {
        sink.line(&format!(
            "Executing {}: {}",
            descriptor.task.display_name(),
            descriptor.command_line()
        ));
        info!(args = descriptor.args.len(), "starting external tool");

        let mut cmd = Command::new(&descriptor.program);
        cmd.args(&descriptor.args);
        if let Some(workdir) = &descriptor.workdir {
            cmd.current_dir(workdir);
        }

        let output = run_streaming(
            &descriptor.program,
            cmd,
            sink,
            self.limits,
            self.cancel.as_ref(),
        )?;

        match output.stopped {
            Some(StopReason::TimedOut) => {
                warn!("external tool timed out");
                return Err(ExecError::TimedOut {
                    program: descriptor.program.clone(),
                    timeout: self.limits.timeout.unwrap_or_default(),
                    log: output.into_log(),
                });
            }
            Some(StopReason::Cancelled) => {
                warn!("external tool cancelled");
                return Err(ExecError::Cancelled {
                    program: descriptor.program.clone(),
                    log: output.into_log(),
                });
            }
            None => {}
        }

        let exit_code = output.status.code();
        let result = ExecutionResult::from_exit(exit_code, output.into_log());
        if result.success {
            debug!("external tool completed successfully");
        } else {
            warn!(?exit_code, "external tool failed");
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TaskKind;
    use crate::io::sink::MemorySink;

    fn descriptor(program: &str, args: &[&str]) -> CommandDescriptor {
        CommandDescriptor {
            task: TaskKind::NugetUpdate,
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            workdir: None,
        }
    }

    #[test]
    fn missing_program_is_launch_error() {
        let sink = MemorySink::new();
        let err = SystemExecutor::default()
            .run(&descriptor("no-such-tool-for-toolrun", &["update"]), &sink)
            .unwrap_err();
        assert!(matches!(err, ExecError::Launch { .. }));
        assert_eq!(
            sink.lines()[0],
            "Executing NuGet Update: \"no-such-tool-for-toolrun\" update"
        );
    }

    #[cfg(unix)]
    #[test]
    fn exit_code_decides_success() {
        let sink = MemorySink::new();
        let executor = SystemExecutor::default();

        let ok = executor
            .run(&descriptor("sh", &["-c", "echo error: harmless"]), &sink)
            .expect("run ok");
        assert!(ok.success);
        assert_eq!(ok.exit_code, Some(0));
        assert!(ok.log.contains("error: harmless"));

        let failed = executor
            .run(&descriptor("sh", &["-c", "echo fine; exit 1"]), &sink)
            .expect("run failed");
        assert!(!failed.success);
        assert_eq!(failed.exit_code, Some(1));
    }

    #[cfg(unix)]
    #[test]
    fn runs_in_workdir() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("marker.txt"), "x").expect("write marker");
        let mut desc = descriptor("ls", &[]);
        desc.workdir = Some(temp.path().to_path_buf());
        let sink = MemorySink::new();
        let result = SystemExecutor::default().run(&desc, &sink).expect("run");
        assert!(result.success);
        assert!(result.log.contains("marker.txt"));
    }
}
