//! Test-only helpers: a scripted executor and fixture writers.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::core::types::{CommandDescriptor, ExecutionResult};
use crate::error::ExecError;
use crate::io::executor::CommandExecutor;
use crate::io::sink::LogSink;

/// Executor that records every descriptor and replays queued outcomes.
///
/// Once the queue is empty every run succeeds with an empty log.
pub struct ScriptedExecutor {
    queue: RefCell<VecDeque<ExecutionResult>>,
    unlaunchable: bool,
    calls: RefCell<Vec<CommandDescriptor>>,
}

impl ScriptedExecutor {
    pub fn new(results: Vec<ExecutionResult>) -> Self {
        Self {
            queue: RefCell::new(results.into_iter().collect()),
            unlaunchable: false,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(Vec::new())
    }

    /// Every run fails as if the program did not exist.
    pub fn unlaunchable() -> Self {
        Self {
            unlaunchable: true,
            ..Self::succeeding()
        }
    }

    /// Descriptors received so far, in call order.
    pub fn calls(&self) -> Vec<CommandDescriptor> {
        self.calls.borrow().clone()
    }
}

impl CommandExecutor for ScriptedExecutor {
    fn run(
        &self,
        descriptor: &CommandDescriptor,
        sink: &dyn LogSink,
    ) -> Result<ExecutionResult, ExecError> {
        self.calls.borrow_mut().push(descriptor.clone());
        sink.line(&format!(
            "Executing {}: {}",
            descriptor.task.display_name(),
            descriptor.command_line()
        ));
        if self.unlaunchable {
            return Err(ExecError::Launch {
                program: descriptor.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted"),
            });
        }
        let result = self
            .queue
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| ExecutionResult::from_exit(Some(0), String::new()));
        for line in result.log.lines() {
            sink.line(line);
        }
        Ok(result)
    }
}

/// Write a minimal SDK-style project file and return its path.
pub fn write_project(dir: &Path, file_name: &str, assembly_name: &str, version: &str) -> PathBuf {
    let path = dir.join(file_name);
    let contents = format!(
        r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <AssemblyName>{assembly_name}</AssemblyName>
    <Version>{version}</Version>
    <Authors>Build Team</Authors>
    <Description>Packs &amp; ships things</Description>
  </PropertyGroup>
</Project>
"#
    );
    std::fs::write(&path, contents).expect("write project fixture");
    path
}
