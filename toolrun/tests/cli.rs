//! CLI tests for the `toolrun` binary.
//!
//! Spawns the binary and checks exit codes and `--dry-run` output.

use std::fs;
use std::process::{Command, Output};

use serde_json::Value;
use toolrun::exit_codes;
use toolrun::io::config::{Registry, load_registry};

fn toolrun(dir: &std::path::Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_toolrun"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("spawn toolrun")
}

fn json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("dry-run json")
}

#[test]
fn init_writes_default_config() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = toolrun(temp.path(), &["init"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));

    let loaded = load_registry(&temp.path().join("toolrun.toml")).expect("load");
    assert_eq!(loaded, Registry::default());
}

#[test]
fn init_keeps_existing_config_without_force() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("toolrun.toml");
    fs::write(&path, "[exec]\ntimeout_secs = 5\n").expect("write");

    let output = toolrun(temp.path(), &["init"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(
        fs::read_to_string(&path).expect("read"),
        "[exec]\ntimeout_secs = 5\n"
    );
}

#[test]
fn nuget_update_dry_run_prints_descriptor() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = toolrun(
        temp.path(),
        &[
            "nuget-update",
            "pkg.nuspec",
            "--repository-path",
            "./packages",
            "--safe",
            "--dry-run",
        ],
    );
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let descriptor = json(&output);
    assert_eq!(descriptor["program"], "nuget");
    assert_eq!(
        descriptor["args"],
        serde_json::json!(["update", "\"pkg.nuspec\"", "-RepositoryPath ./packages", "-Safe"])
    );
}

#[test]
fn config_defaults_apply_to_dry_run() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(
        temp.path().join("ci.toml"),
        "[msbuild]\nframework = \"net35\"\nno_logo = true\n",
    )
    .expect("write config");

    let output = toolrun(
        temp.path(),
        &["--config", "ci.toml", "msbuild", "App.sln", "--target", "Build", "--dry-run"],
    );
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let descriptor = json(&output);
    assert!(
        descriptor["program"]
            .as_str()
            .is_some_and(|p| p.ends_with("Microsoft.NET/Framework/v3.5/MSBuild.exe"))
    );
    assert_eq!(
        descriptor["args"],
        serde_json::json!(["\"App.sln\"", "/nologo", "/target:Build"])
    );
}

#[test]
fn command_line_lists_replace_config_lists() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(
        temp.path().join("toolrun.toml"),
        "[nuget_update]\nsource = [\"https://default.example\"]\nsafe = true\n",
    )
    .expect("write config");

    let output = toolrun(
        temp.path(),
        &[
            "nuget-update",
            "pkg.nuspec",
            "--source",
            "https://mine.example",
            "--no-safe",
            "--dry-run",
        ],
    );
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(
        json(&output)["args"],
        serde_json::json!(["update", "\"pkg.nuspec\"", "-Source \"https://mine.example\""])
    );
}

#[test]
fn invalid_config_exits_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("toolrun.toml"), "[exec]\ntimeout_secs = 0\n").expect("write");
    let output = toolrun(temp.path(), &["nuget-update", "pkg.nuspec", "--dry-run"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
}

#[test]
fn pack_dry_run_rejects_unknown_input() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = toolrun(temp.path(), &["nuget-pack", "notes.txt", "--dry-run"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("notes.txt"));
}

#[test]
fn pack_dry_run_lists_one_command_per_input() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = toolrun(
        temp.path(),
        &[
            "nuget-pack",
            "a.nuspec",
            "src/Lib/Lib.csproj",
            "--out",
            "dist",
            "--dry-run",
        ],
    );
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let descriptors = json(&output);
    assert_eq!(
        descriptors[0]["args"],
        serde_json::json!(["Pack", "-OutputDirectory", "dist", "a.nuspec"])
    );
    assert_eq!(descriptors[1]["args"][3], "dist/Lib.nuspec");
    // Dry runs never synthesize manifests.
    assert!(!temp.path().join("dist").exists());
}

#[test]
fn missing_tool_exits_failed_and_writes_log_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = toolrun(
        temp.path(),
        &[
            "--log-file",
            "build.log",
            "nuget-update",
            "pkg.nuspec",
            "--command",
            "/nonexistent/toolrun-test/nuget",
        ],
    );
    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    let log = fs::read_to_string(temp.path().join("build.log")).expect("read log");
    assert!(log.contains("Executing NuGet Update"));
}

#[cfg(unix)]
#[test]
fn packed_manifest_resolves_from_its_own_directory() {
    let temp = tempfile::tempdir().expect("tempdir");
    let project_dir = temp.path().join("src/App");
    fs::create_dir_all(project_dir.join("bin/Debug")).expect("mkdir");
    fs::write(project_dir.join("bin/Debug/App.dll"), "").expect("write dll");
    toolrun::test_support::write_project(&project_dir, "App.csproj", "App", "1.0.0");

    let output = toolrun(
        temp.path(),
        &[
            "nuget-pack",
            "src/App/App.csproj",
            "--out",
            "build/packages",
            "--configuration",
            "Debug",
            "--command",
            "true",
        ],
    );
    assert_eq!(output.status.code(), Some(exit_codes::OK));

    let manifest = temp.path().join("build/packages/App.nuspec");
    let xml = fs::read_to_string(&manifest)
        .expect("read manifest")
        .replace("&#x2f;", "/");
    let src = xml
        .split("src=\"")
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .expect("file src");
    // NuGet resolves relative sources against the manifest directory.
    let resolved = manifest.parent().expect("manifest dir").join(src);
    assert!(resolved.is_file(), "{src}");
}
