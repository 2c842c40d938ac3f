//! Process-wide task defaults stored in `toolrun.toml`.
//!
//! The [`Registry`] is built once at startup (from a file or in code) and
//! then only ever shared by reference. Task constructors read their defaults
//! from it through [`Registry::defaults_for`].

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::options::OptionStore;
use crate::core::types::TaskKind;
use crate::io::process::RunLimits;
use crate::tools::msbuild::{self, Framework, Verbosity};
use crate::tools::{nuget_pack, nuget_update};

pub const DEFAULT_CONFIG_FILE: &str = "toolrun.toml";

/// Task defaults (TOML).
///
/// Intended to be edited by humans. Missing sections and fields fall back to
/// the values in [`Default`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Registry {
    pub exec: ExecConfig,
    pub msbuild: MsBuildDefaults,
    pub nuget_update: NugetUpdateDefaults,
    pub nuget_pack: NugetPackDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExecConfig {
    /// Wall-clock budget for one external tool run, in seconds.
    pub timeout_secs: u64,

    /// Captured log bytes kept per run; the sink still receives everything.
    pub output_limit_bytes: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30 * 60,
            output_limit_bytes: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MsBuildDefaults {
    /// Explicit path to `MSBuild.exe`; wins over `framework`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<Framework>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbosity: Option<Verbosity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logger_module: Option<String>,
    pub no_logo: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NugetUpdateDefaults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub source: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub id: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_path: Option<String>,
    pub safe: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NugetPackDefaults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out: Option<String>,
    pub symbols: bool,
    /// Build configuration whose output a synthesized manifest packs. Falls
    /// back to `msbuild.properties.configuration`, then `Release`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<String>,
}

impl Registry {
    pub fn validate(&self) -> Result<()> {
        if self.exec.timeout_secs == 0 {
            return Err(anyhow!("exec.timeout_secs must be > 0"));
        }
        if self.exec.output_limit_bytes == 0 {
            return Err(anyhow!("exec.output_limit_bytes must be > 0"));
        }
        let commands = [
            ("msbuild.command", &self.msbuild.command),
            ("nuget_update.command", &self.nuget_update.command),
            ("nuget_pack.command", &self.nuget_pack.command),
            ("nuget_pack.configuration", &self.nuget_pack.configuration),
        ];
        for (name, command) in commands {
            if command.as_deref().is_some_and(|c| c.trim().is_empty()) {
                return Err(anyhow!("{name} must not be empty"));
            }
        }
        Ok(())
    }

    pub fn limits(&self) -> RunLimits {
        RunLimits {
            timeout: Some(Duration::from_secs(self.exec.timeout_secs)),
            output_limit_bytes: self.exec.output_limit_bytes,
        }
    }

    /// Snapshot of the configured defaults for one task kind.
    ///
    /// Boolean defaults are only recorded when `true`, so flags stay absent
    /// unless someone asked for them.
    pub fn defaults_for(&self, kind: TaskKind) -> OptionStore {
        let mut store = OptionStore::new();
        match kind {
            TaskKind::MsBuild => {
                let d = &self.msbuild;
                set_opt(&mut store, msbuild::COMMAND, d.command.as_deref());
                set_opt(
                    &mut store,
                    msbuild::FRAMEWORK,
                    d.framework.map(Framework::as_str),
                );
                set_opt(
                    &mut store,
                    msbuild::VERBOSITY,
                    d.verbosity.map(Verbosity::as_str),
                );
                set_opt(&mut store, msbuild::LOGGER_MODULE, d.logger_module.as_deref());
                set_flag(&mut store, msbuild::NO_LOGO, d.no_logo);
                set_list(&mut store, msbuild::TARGETS, &d.targets);
                for (key, value) in &d.properties {
                    store.insert_entry(msbuild::PROPERTIES, key.as_str(), value.as_str());
                }
            }
            TaskKind::NugetUpdate => {
                let d = &self.nuget_update;
                set_opt(&mut store, nuget_update::COMMAND, d.command.as_deref());
                set_list(&mut store, nuget_update::SOURCE, &d.source);
                set_list(&mut store, nuget_update::ID, &d.id);
                set_opt(
                    &mut store,
                    nuget_update::REPOSITORY_PATH,
                    d.repository_path.as_deref(),
                );
                set_flag(&mut store, nuget_update::SAFE, d.safe);
            }
            TaskKind::NugetPack => {
                let d = &self.nuget_pack;
                set_opt(&mut store, nuget_pack::COMMAND, d.command.as_deref());
                set_opt(&mut store, nuget_pack::OUT, d.out.as_deref());
                set_flag(&mut store, nuget_pack::SYMBOLS, d.symbols);
                let configuration = d
                    .configuration
                    .as_deref()
                    .or_else(|| self.msbuild_configuration());
                set_opt(&mut store, nuget_pack::CONFIGURATION, configuration);
            }
        }
        store
    }

    fn msbuild_configuration(&self) -> Option<&str> {
        self.msbuild
            .properties
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("configuration"))
            .map(|(_, value)| value.as_str())
    }
}

fn set_opt(store: &mut OptionStore, option: &str, value: Option<&str>) {
    if let Some(value) = value {
        store.set(option, value);
    }
}

fn set_flag(store: &mut OptionStore, option: &str, enabled: bool) {
    if enabled {
        store.enable(option);
    }
}

fn set_list(store: &mut OptionStore, option: &str, values: &[String]) {
    if !values.is_empty() {
        store.set(option, values.to_vec());
    }
}

/// Load the registry from a TOML file.
///
/// If the file is missing, returns `Registry::default()`.
pub fn load_registry(path: &Path) -> Result<Registry> {
    if !path.exists() {
        let registry = Registry::default();
        registry.validate()?;
        return Ok(registry);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let registry: Registry =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    registry.validate()?;
    Ok(registry)
}

/// Atomically write the registry to disk (temp file + rename).
pub fn write_registry(path: &Path, registry: &Registry) -> Result<()> {
    registry.validate()?;
    let mut buf = toml::to_string_pretty(registry).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
