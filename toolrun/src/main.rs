//! Build-task runner for MSBuild and NuGet.
//!
//! Loads task defaults from `toolrun.toml` (if present), applies the
//! command-line options on top and runs the external tool, streaming its
//! output to stdout and optionally to a log file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;

use toolrun::core::dispatch::InputFile;
use toolrun::exit_codes;
use toolrun::io::config::{DEFAULT_CONFIG_FILE, Registry, load_registry, write_registry};
use toolrun::io::executor::SystemExecutor;
use toolrun::io::sink::{ConsoleSink, FileSink, LogSink, TeeSink};
use toolrun::report::{BuildStop, FailureKind};
use toolrun::tools::msbuild::{Framework, MsBuild, Verbosity};
use toolrun::tools::nuget_pack::NugetPack;
use toolrun::tools::nuget_update::NugetUpdate;

#[derive(Parser)]
#[command(name = "toolrun", version, about = "Run MSBuild and NuGet build tasks")]
struct Cli {
    /// Task defaults file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Also append the build log to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a config file with the default settings.
    Init {
        /// Overwrite an existing config file.
        #[arg(short, long)]
        force: bool,
    },
    /// Build a solution or project with MSBuild.
    Msbuild {
        solution: String,
        /// Target to build; repeat for several.
        #[arg(long = "target")]
        targets: Vec<String>,
        /// Build property as KEY=VALUE; repeat for several.
        #[arg(long = "property", value_parser = parse_key_value)]
        properties: Vec<(String, String)>,
        #[arg(long, value_enum)]
        verbosity: Option<Verbosity>,
        #[arg(long)]
        logger: Option<String>,
        #[arg(long)]
        no_logo: bool,
        /// Extra `/NAME:"VALUE"` switch as NAME=VALUE.
        #[arg(long = "switch", value_parser = parse_key_value)]
        switches: Vec<(String, String)>,
        #[arg(long, value_enum)]
        framework: Option<Framework>,
        /// Explicit MSBuild executable.
        #[arg(long)]
        command: Option<String>,
        /// Print the command as JSON instead of running it.
        #[arg(long)]
        dry_run: bool,
    },
    /// Update package references with `nuget update`.
    NugetUpdate {
        input_file: String,
        #[arg(long)]
        source: Vec<String>,
        #[arg(long)]
        id: Vec<String>,
        #[arg(long)]
        repository_path: Option<String>,
        #[arg(long)]
        safe: bool,
        /// Turn off a `safe = true` default from the config file.
        #[arg(long, conflicts_with = "safe")]
        no_safe: bool,
        #[arg(long)]
        command: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Create packages from `.nuspec` manifests or project files.
    NugetPack {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Package output directory.
        #[arg(long)]
        out: Option<String>,
        #[arg(long)]
        symbols: bool,
        /// Build configuration packed from project inputs (default: Release).
        #[arg(long)]
        configuration: Option<String>,
        #[arg(long)]
        command: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() {
    toolrun::logging::init();
    let code = match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

/// Everything a task command needs: defaults, the build log and an executor.
struct Session {
    registry: Registry,
    sink: Box<dyn LogSink>,
    executor: SystemExecutor,
}

impl Session {
    fn open(config: &Path, log_file: Option<&Path>) -> Result<Self> {
        let registry = load_registry(config)?;
        debug!(config = %config.display(), "loaded registry");
        let sink = open_sink(log_file)?;
        let executor = SystemExecutor::new(registry.limits());
        Ok(Self {
            registry,
            sink,
            executor,
        })
    }
}

fn run(cli: Cli) -> Result<i32> {
    let open = || Session::open(&cli.config, cli.log_file.as_deref());
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Msbuild {
            solution,
            targets,
            properties,
            verbosity,
            logger,
            no_logo,
            switches,
            framework,
            command,
            dry_run,
        } => {
            let session = open()?;
            let mut build = MsBuild::new(&session.registry);
            build.solution(solution);
            for target in targets {
                build.target(target);
            }
            for (key, value) in properties {
                build.property(key, value);
            }
            for (name, value) in switches {
                build.other_switch(name, value);
            }
            if let Some(verbosity) = verbosity {
                build.verbosity(verbosity);
            }
            if let Some(logger) = logger {
                build.logger_module(logger);
            }
            if no_logo {
                build.no_logo();
            }
            if let Some(framework) = framework {
                build.use_framework(framework);
            }
            if let Some(command) = command {
                build.command(command);
            }
            if dry_run {
                return print_or_invalid(build.descriptor());
            }
            Ok(exit_code(build.execute(&session.executor, session.sink.as_ref()).err()))
        }
        Command::NugetUpdate {
            input_file,
            source,
            id,
            repository_path,
            safe,
            no_safe,
            command,
            dry_run,
        } => {
            let session = open()?;
            let mut update = NugetUpdate::new(&session.registry);
            update.input_file(input_file);
            for source in source {
                update.source(source);
            }
            for id in id {
                update.id(id);
            }
            if let Some(path) = repository_path {
                update.repository_path(path);
            }
            if safe {
                update.safe();
            }
            if no_safe {
                update.safe_off();
            }
            if let Some(command) = command {
                update.command(command);
            }
            if dry_run {
                return print_or_invalid(update.descriptor());
            }
            Ok(exit_code(update.execute(&session.executor, session.sink.as_ref()).err()))
        }
        Command::NugetPack {
            files,
            out,
            symbols,
            configuration,
            command,
            dry_run,
        } => {
            let session = open()?;
            let mut pack = NugetPack::new(&session.registry);
            if let Some(configuration) = configuration {
                pack.configuration(configuration);
            }
            if let Some(out) = out {
                pack.out(out);
            }
            if symbols {
                pack.symbols();
            }
            if let Some(command) = command {
                pack.command(command);
            }
            let inputs: Vec<InputFile> = files.into_iter().map(InputFile::new).collect();
            if dry_run {
                let descriptors: Result<Vec<_>, _> =
                    inputs.iter().map(|input| pack.descriptor_for(input)).collect();
                return print_or_invalid(descriptors);
            }
            Ok(exit_code(
                pack.execute_all(&inputs, &session.executor, session.sink.as_ref()).err(),
            ))
        }
    }
}

fn cmd_init(config: &Path, force: bool) -> Result<i32> {
    if config.exists() && !force {
        println!("{} already exists (use --force to overwrite)", config.display());
        return Ok(exit_codes::OK);
    }
    write_registry(config, &Registry::default())
        .with_context(|| format!("write {}", config.display()))?;
    println!("wrote {}", config.display());
    Ok(exit_codes::OK)
}

fn open_sink(log_file: Option<&Path>) -> Result<Box<dyn LogSink>> {
    match log_file {
        Some(path) => {
            let file = FileSink::create(path)?;
            Ok(Box::new(TeeSink::new().with(ConsoleSink).with(file)))
        }
        None => Ok(Box::new(ConsoleSink)),
    }
}

/// Pretty-print `value` as JSON, or report the error and return [`exit_codes::INVALID`].
fn print_or_invalid<T: Serialize, E: std::fmt::Display>(value: Result<T, E>) -> Result<i32> {
    match value {
        Ok(value) => {
            let json = serde_json::to_string_pretty(&value).context("serialize descriptor")?;
            println!("{json}");
            Ok(exit_codes::OK)
        }
        Err(err) => {
            eprintln!("{err}");
            Ok(exit_codes::INVALID)
        }
    }
}

fn exit_code(stop: Option<BuildStop>) -> i32 {
    match stop.map(|stop| stop.kind()) {
        None => exit_codes::OK,
        Some(FailureKind::Configuration | FailureKind::Dispatch) => exit_codes::INVALID,
        Some(
            FailureKind::Execution
            | FailureKind::Launch
            | FailureKind::Interrupted
            | FailureKind::Preparation,
        ) => exit_codes::FAILED,
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    if key.is_empty() {
        return Err(format!("empty key in `{raw}`"));
    }
    Ok((key.to_string(), value.to_string()))
}
