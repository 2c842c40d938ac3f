//! `nuget update`: refresh package references of a packages file or project.

use std::path::PathBuf;

use crate::core::grammar::{ArgSpec, FlagStyle, Grammar, Position, Quoting};
use crate::core::types::{CommandDescriptor, ExecutionResult, TaskKind};
use crate::error::ConfigError;
use crate::io::config::Registry;
use crate::io::executor::CommandExecutor;
use crate::io::sink::LogSink;
use crate::report::BuildStop;
use crate::task::ToolTask;

pub use super::COMMAND;

pub const INPUT_FILE: &str = "input_file";
pub const SOURCE: &str = "source";
pub const ID: &str = "id";
pub const REPOSITORY_PATH: &str = "repository_path";
pub const SAFE: &str = "safe";

pub const DEFAULT_COMMAND: &str = "nuget";

pub static GRAMMAR: Grammar = Grammar {
    tool: "nuget",
    version: "2.x",
    verb: &["update"],
    args: &[
        ArgSpec::positional(INPUT_FILE, Position::Leading)
            .quoted(Quoting::Always)
            .required("nugetupdate requires #input_file"),
        ArgSpec::valued(SOURCE, "-Source", FlagStyle::Joined(" ")).quoted(Quoting::Always),
        ArgSpec::valued(ID, "-Id", FlagStyle::Joined(" ")).quoted(Quoting::Always),
        ArgSpec::valued(REPOSITORY_PATH, "-RepositoryPath", FlagStyle::Joined(" ")),
        ArgSpec::switch(SAFE, "-Safe"),
    ],
};

#[derive(Debug, Clone)]
pub struct NugetUpdate {
    task: ToolTask,
}

impl NugetUpdate {
    pub fn new(registry: &Registry) -> Self {
        Self {
            task: ToolTask::new(TaskKind::NugetUpdate, &GRAMMAR, registry),
        }
    }

    pub fn input_file(&mut self, path: impl Into<String>) -> &mut Self {
        self.task.options_mut().set(INPUT_FILE, path.into());
        self
    }

    pub fn repository_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.task.options_mut().set(REPOSITORY_PATH, path.into());
        self
    }

    /// Add a package source; may be called repeatedly.
    pub fn source(&mut self, source: impl Into<String>) -> &mut Self {
        self.task.options_mut().append(SOURCE, source);
        self
    }

    /// Restrict the update to a package id; may be called repeatedly.
    pub fn id(&mut self, id: impl Into<String>) -> &mut Self {
        self.task.options_mut().append(ID, id);
        self
    }

    /// Only update to the highest version within the same major/minor.
    pub fn safe(&mut self) -> &mut Self {
        self.task.options_mut().enable(SAFE);
        self
    }

    /// Drop a `safe` default coming from the registry.
    pub fn safe_off(&mut self) -> &mut Self {
        self.task.options_mut().disable(SAFE);
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

    pub fn program(&self) -> String {
        self.task.option_or(COMMAND, DEFAULT_COMMAND)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_update_with_repository_and_safe() {
        let mut update = NugetUpdate::new(&Registry::default());
        update
            .input_file("pkg.nuspec")
            .repository_path("./packages")
            .safe();
        assert_eq!(
            update.build_parameters().expect("build"),
            vec![
                "update",
                "\"pkg.nuspec\"",
                "-RepositoryPath ./packages",
                "-Safe"
            ]
        );
    }

    #[test]
    fn sources_and_ids_join_with_semicolons() {
        let mut update = NugetUpdate::new(&Registry::default());
        update
            .id("Newtonsoft.Json")
            .source("https://a.example/feed")
            .input_file("packages.config")
            .source("https://b.example/feed")
            .id("NUnit");
        assert_eq!(
            update.build_parameters().expect("build"),
            vec![
                "update",
                "\"packages.config\"",
                "-Source \"https://a.example/feed;https://b.example/feed\"",
                "-Id \"Newtonsoft.Json;NUnit\"",
            ]
        );
    }

    #[test]
    fn safe_is_off_unless_requested() {
        let mut update = NugetUpdate::new(&Registry::default());
        update.input_file("pkg.nuspec");
        let params = update.build_parameters().expect("build");
        assert!(!params.iter().any(|p| p == "-Safe"));
    }

    #[test]
    fn registry_defaults_yield_to_instance_values() {
        let mut registry = Registry::default();
        registry.nuget_update.repository_path = Some("./default".to_string());
        registry.nuget_update.command = Some("/opt/nuget".to_string());

        let mut update = NugetUpdate::new(&registry);
        update.input_file("pkg.nuspec").repository_path("./mine");
        assert_eq!(update.program(), "/opt/nuget");
        assert!(
            update
                .build_parameters()
                .expect("build")
                .contains(&"-RepositoryPath ./mine".to_string())
        );
    }

    #[test]
    fn instance_source_replaces_registry_source() {
        let mut registry = Registry::default();
        registry.nuget_update.source = vec!["https://default.example".to_string()];
        let mut update = NugetUpdate::new(&registry);
        update.input_file("pkg.nuspec").source("https://mine.example");
        assert_eq!(
            update.build_parameters().expect("build"),
            vec!["update", "\"pkg.nuspec\"", "-Source \"https://mine.example\""]
        );
    }

    #[test]
    fn registry_safe_can_be_turned_off() {
        let mut registry = Registry::default();
        registry.nuget_update.safe = true;
        let mut update = NugetUpdate::new(&registry);
        update.input_file("pkg.nuspec");
        assert!(update.build_parameters().expect("build").contains(&"-Safe".to_string()));
        update.safe_off();
        assert!(!update.build_parameters().expect("build").contains(&"-Safe".to_string()));
    }

    #[test]
    fn program_defaults_to_nuget() {
        let update = NugetUpdate::new(&Registry::default());
        assert_eq!(update.program(), "nuget");
    }
}
