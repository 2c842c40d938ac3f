//! `nuget pack`: build a package from a manifest or an MSBuild project.
//!
//! The same wrapper handles both inputs. A [`VariantRegistry`] of
//! [`PackVariant`]s picks how an input becomes a `.nuspec` manifest; the
//! command itself is identical once the manifest path is known.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, instrument};

use crate::core::dispatch::{InputFile, Variant, VariantRegistry};
use crate::core::grammar::{ArgSpec, FlagStyle, Grammar, Position};
use crate::core::types::{CommandDescriptor, ExecutionResult, TaskKind};
use crate::io::config::Registry;
use crate::io::executor::CommandExecutor;
use crate::io::nuspec;
use crate::io::sink::LogSink;
use crate::report::{BuildStop, Failure, FailureReporter};
use crate::task::ToolTask;

pub use super::COMMAND;

pub const OUT: &str = "out";
pub const SYMBOLS: &str = "symbols";
pub const MANIFEST: &str = "manifest";
/// Build configuration packed from a project input. Not a command-line flag.
pub const CONFIGURATION: &str = "configuration";

pub const DEFAULT_COMMAND: &str = "nuget";
pub const DEFAULT_CONFIGURATION: &str = "Release";

pub static GRAMMAR: Grammar = Grammar {
    tool: "nuget",
    version: "2.x",
    verb: &["Pack"],
    args: &[
        ArgSpec::valued(OUT, "-OutputDirectory", FlagStyle::Separate),
        ArgSpec::switch(SYMBOLS, "-Symbols"),
        ArgSpec::positional(MANIFEST, Position::Trailing)
            .required("nugetpack requires a .nuspec manifest"),
    ],
};

/// Settings shared by every variant while preparing one input.
#[derive(Debug, Clone)]
pub struct PackContext {
    pub out: Option<PathBuf>,
    /// Selects `bin/{configuration}` when synthesizing a manifest.
    pub configuration: String,
}

impl Default for PackContext {
    fn default() -> Self {
        Self {
            out: None,
            configuration: DEFAULT_CONFIGURATION.to_string(),
        }
    }
}

/// Turns an accepted input into the manifest that `nuget pack` consumes.
pub trait PackVariant: Variant {
    /// Produce the manifest on disk, returning its path.
    fn prepare(&self, input: &InputFile, ctx: &PackContext) -> Result<PathBuf>;

    /// Manifest path `prepare` would return, without touching the filesystem.
    fn planned_manifest(&self, input: &InputFile, ctx: &PackContext) -> PathBuf;
}

/// Input is already a `.nuspec`; pass it through.
#[derive(Debug, Default)]
pub struct NuspecVariant;

impl Variant for NuspecVariant {
    fn name(&self) -> &str {
        "nuspec"
    }

    fn accepts(&self, input: &InputFile) -> bool {
        input.has_extension(&["nuspec"])
    }
}

impl PackVariant for NuspecVariant {
    fn prepare(&self, input: &InputFile, ctx: &PackContext) -> Result<PathBuf> {
        Ok(self.planned_manifest(input, ctx))
    }

    fn planned_manifest(&self, input: &InputFile, _ctx: &PackContext) -> PathBuf {
        input.path().to_path_buf()
    }
}

/// Input is a C#, F# or VB project; synthesize a manifest from its properties.
#[derive(Debug, Default)]
pub struct ProjectVariant;

impl ProjectVariant {
    pub const EXTENSIONS: &'static [&'static str] = &["csproj", "fsproj", "vbproj"];
}

impl Variant for ProjectVariant {
    fn name(&self) -> &str {
        "project"
    }

    fn accepts(&self, input: &InputFile) -> bool {
        input.has_extension(Self::EXTENSIONS)
    }
}

impl PackVariant for ProjectVariant {
    fn prepare(&self, input: &InputFile, ctx: &PackContext) -> Result<PathBuf> {
        nuspec::write_nuspec(input.path(), ctx.out.as_deref(), &ctx.configuration)
    }

    fn planned_manifest(&self, input: &InputFile, ctx: &PackContext) -> PathBuf {
        nuspec::manifest_path(input.path(), ctx.out.as_deref())
    }
}

/// Manifest passthrough first, then project synthesis.
pub fn default_variants() -> VariantRegistry<dyn PackVariant> {
    let mut variants: VariantRegistry<dyn PackVariant> = VariantRegistry::new();
    variants
        .register(Box::new(NuspecVariant))
        .register(Box::new(ProjectVariant));
    variants
}

/// Packs one or more inputs with shared settings.
///
/// Each input runs as its own [`ToolTask`] cloned from a configured template,
/// so one input's failure cannot leak state into the next.
pub struct NugetPack {
    template: ToolTask,
    variants: VariantRegistry<dyn PackVariant>,
}

impl NugetPack {
    pub fn new(registry: &Registry) -> Self {
        Self::with_variants(registry, default_variants())
    }

    pub fn with_variants(registry: &Registry, variants: VariantRegistry<dyn PackVariant>) -> Self {
        Self {
            template: ToolTask::new(TaskKind::NugetPack, &GRAMMAR, registry),
            variants,
        }
    }

    pub fn out(&mut self, dir: impl Into<String>) -> &mut Self {
        self.template.options_mut().set(OUT, dir.into());
        self
    }

    pub fn symbols(&mut self) -> &mut Self {
        self.template.options_mut().enable(SYMBOLS);
        self
    }

    /// Build configuration whose output a synthesized manifest packs.
    pub fn configuration(&mut self, name: impl Into<String>) -> &mut Self {
        self.template.options_mut().set(CONFIGURATION, name.into());
        self
    }

    pub fn command(&mut self, program: impl Into<String>) -> &mut Self {
        self.template.options_mut().set(COMMAND, program.into());
        self
    }

    pub fn workdir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.template.set_workdir(dir);
        self
    }

    pub fn program(&self) -> String {
        self.template.option_or(COMMAND, DEFAULT_COMMAND)
    }

    fn context(&self) -> PackContext {
        PackContext {
            out: self.template.options().get_str(OUT).map(PathBuf::from),
            configuration: self.template.option_or(CONFIGURATION, DEFAULT_CONFIGURATION),
        }
    }

    fn task_for(&self, manifest: &Path) -> ToolTask {
        let mut task = self.template.clone();
        task.options_mut()
            .set(MANIFEST, manifest.to_string_lossy().into_owned());
        task.mark_dispatched();
        task
    }

    /// Command that would run for `input`, without preparing anything on disk.
    pub fn descriptor_for(&self, input: &InputFile) -> Result<CommandDescriptor, Failure> {
        let variant = self.variants.dispatch(input)?;
        let manifest = variant.planned_manifest(input, &self.context());
        Ok(self.task_for(&manifest).descriptor(self.program())?)
    }

    /// Dispatch, prepare and run the pack command for a single input.
    #[instrument(skip_all, fields(input = %input))]
    pub fn execute_one<E: CommandExecutor + ?Sized>(
        &self,
        input: &InputFile,
        executor: &E,
        sink: &dyn LogSink,
    ) -> Result<ExecutionResult, BuildStop> {
        let reporter = FailureReporter::new(sink);
        let variant = self
            .variants
            .dispatch(input)
            .map_err(|err| reporter.report(TaskKind::NugetPack, err))?;
        debug!(variant = variant.name(), "dispatched");

        let manifest = variant
            .prepare(input, &self.context())
            .map_err(|err| reporter.report(TaskKind::NugetPack, Failure::Preparation(err)))?;
        self.task_for(&manifest)
            .execute(self.program(), executor, sink)
    }

    /// Pack every input in order, stopping at the first failure.
    pub fn execute_all<E: CommandExecutor + ?Sized>(
        &self,
        inputs: &[InputFile],
        executor: &E,
        sink: &dyn LogSink,
    ) -> Result<Vec<ExecutionResult>, BuildStop> {
        inputs
            .iter()
            .map(|input| self.execute_one(input, executor, sink))
            .collect()
    }
}
