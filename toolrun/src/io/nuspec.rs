//! Synthesizing a `.nuspec` manifest from an MSBuild project file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use regex::Regex;
use tracing::debug;

const NUSPEC_TEMPLATE: &str = include_str!("../../templates/nuspec.xml");
const DEFAULT_VERSION: &str = "1.0.0";

static PROPERTY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"<(AssemblyName|RootNamespace|Version|Authors|Description)>\s*([^<]*?)\s*</(?:AssemblyName|RootNamespace|Version|Authors|Description)>",
    )
    .expect("project property regex is valid")
});

/// Package metadata pulled out of a project file's property groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectMetadata {
    pub id: String,
    pub version: String,
    pub authors: String,
    pub description: String,
}

impl ProjectMetadata {
    /// First value of each known property wins. `fallback_id` is used when the
    /// project sets neither `AssemblyName` nor `RootNamespace`.
    pub fn parse(project_xml: &str, fallback_id: &str) -> Self {
        let mut found: HashMap<&str, String> = HashMap::new();
        for caps in PROPERTY_RE.captures_iter(project_xml) {
            let (Some(name), Some(value)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            if value.as_str().is_empty() {
                continue;
            }
            found
                .entry(name.as_str())
                .or_insert_with(|| unescape_xml(value.as_str()));
        }

        let id = found
            .remove("AssemblyName")
            .or_else(|| found.remove("RootNamespace"))
            .unwrap_or_else(|| fallback_id.to_string());
        Self {
            version: found
                .remove("Version")
                .unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            authors: found.remove("Authors").unwrap_or_else(|| id.clone()),
            description: found.remove("Description").unwrap_or_else(|| id.clone()),
            id,
        }
    }
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Render manifest XML for `meta`, packing `assembly` into `lib/`.
pub fn render_nuspec(meta: &ProjectMetadata, assembly: &str) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("nuspec.xml", NUSPEC_TEMPLATE)
        .context("load nuspec template")?;
    let template = env.get_template("nuspec.xml")?;
    let rendered = template
        .render(context! {
            id => &meta.id,
            version => &meta.version,
            authors => &meta.authors,
            description => &meta.description,
            assembly => assembly,
        })
        .context("render nuspec template")?;
    Ok(rendered)
}

/// Where the manifest for `project` is written: `{out_dir}/{stem}.nuspec`,
/// or next to the project when no output directory is configured.
pub fn manifest_path(project: &Path, out_dir: Option<&Path>) -> PathBuf {
    let stem = project
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "package".to_string());
    let dir = out_dir
        .map(Path::to_path_buf)
        .or_else(|| project.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(format!("{stem}.nuspec"))
}

/// Absolute path of the assembly built for `project` under `configuration`.
///
/// NuGet resolves `<file src>` against the manifest's directory, which is
/// usually not the project directory, so the path must not be relative.
pub fn assembly_path(project: &Path, id: &str, configuration: &str) -> Result<PathBuf> {
    let project_dir = project.parent().unwrap_or_else(|| Path::new(""));
    let relative = project_dir
        .join("bin")
        .join(configuration)
        .join(format!("{id}.dll"));
    std::path::absolute(&relative)
        .with_context(|| format!("resolve assembly path {}", relative.display()))
}

/// Read `project`, render its manifest and write it to [`manifest_path`].
pub fn write_nuspec(project: &Path, out_dir: Option<&Path>, configuration: &str) -> Result<PathBuf> {
    let xml = fs::read_to_string(project)
        .with_context(|| format!("read project {}", project.display()))?;
    let stem = project
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let meta = ProjectMetadata::parse(&xml, &stem);

    let assembly = assembly_path(project, &meta.id, configuration)?;
    let rendered = render_nuspec(&meta, &assembly.to_string_lossy())?;

    let path = manifest_path(project, out_dir);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create manifest dir {}", parent.display()))?;
    }
    fs::write(&path, rendered).with_context(|| format!("write {}", path.display()))?;
    debug!(manifest = %path.display(), id = %meta.id, "synthesized nuspec");
    Ok(path)
}
