//! Real subprocess runs through `SystemExecutor`.

#![cfg(unix)]

use std::thread;
use std::time::{Duration, Instant};

use toolrun::core::types::{CommandDescriptor, TaskKind};
use toolrun::error::ExecError;
use toolrun::io::config::Registry;
use toolrun::io::executor::{CommandExecutor, SystemExecutor};
use toolrun::io::process::{CancelToken, RunLimits};
use toolrun::io::sink::MemorySink;
use toolrun::report::FailureKind;
use toolrun::tools::nuget_update::NugetUpdate;

fn shell(script: &str) -> CommandDescriptor {
    CommandDescriptor {
        task: TaskKind::NugetUpdate,
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        workdir: None,
    }
}

#[test]
fn output_streams_to_sink_and_log() {
    let sink = MemorySink::new();
    let result = SystemExecutor::default()
        .run(&shell("echo one; echo two 1>&2"), &sink)
        .expect("run");
    assert!(result.success);
    assert_eq!(result.exit_code, Some(0));
    assert!(result.log.contains("one"));
    assert!(result.log.contains("two"));
    let lines = sink.lines();
    assert!(lines[0].starts_with("Executing NuGet Update: \"sh\""));
    assert!(lines.iter().any(|l| l == "one"));
}

#[test]
fn error_text_with_zero_exit_is_success() {
    let sink = MemorySink::new();
    let result = SystemExecutor::default()
        .run(&shell("echo 'error: not really'"), &sink)
        .expect("run");
    assert!(result.success);
}

#[test]
fn non_zero_exit_is_reported_with_code() {
    let sink = MemorySink::new();
    let result = SystemExecutor::default()
        .run(&shell("exit 3"), &sink)
        .expect("run");
    assert!(!result.success);
    assert_eq!(result.exit_code, Some(3));
}

#[test]
fn timeout_kills_the_child() {
    let limits = RunLimits {
        timeout: Some(Duration::from_millis(200)),
        ..RunLimits::default()
    };
    let sink = MemorySink::new();
    let err = SystemExecutor::new(limits)
        .run(&shell("echo started; exec sleep 5"), &sink)
        .unwrap_err();
    assert!(matches!(err, ExecError::TimedOut { .. }), "{err:?}");
}

#[test]
fn timeout_is_not_held_up_by_a_grandchild() {
    let limits = RunLimits {
        timeout: Some(Duration::from_millis(200)),
        ..RunLimits::default()
    };
    let sink = MemorySink::new();
    let started = Instant::now();
    let err = SystemExecutor::new(limits)
        .run(&shell("sleep 4; echo done"), &sink)
        .unwrap_err();
    assert!(matches!(err, ExecError::TimedOut { .. }), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(2), "{:?}", started.elapsed());
}

#[test]
fn cancel_from_another_thread_stops_the_run() {
    let token = CancelToken::new();
    let executor = SystemExecutor::default().with_cancel(token.clone());
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        token.cancel();
    });
    let sink = MemorySink::new();
    let started = Instant::now();
    let err = executor
        .run(&shell("echo waiting; sleep 5"), &sink)
        .unwrap_err();
    canceller.join().expect("canceller thread");
    let (program, log) = match err {
        ExecError::Cancelled { program, log } => (program, log),
        other => panic!("expected cancellation, got {other:?}"),
    };
    assert_eq!(program, "sh");
    assert!(log.contains("waiting"));
    assert!(started.elapsed() < Duration::from_secs(3), "{:?}", started.elapsed());
}

#[test]
fn task_failure_goes_through_reporter() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut update = NugetUpdate::new(&Registry::default());
    // `sh update ...` fails: there is no script named `update`.
    update
        .input_file("pkg.nuspec")
        .command("sh")
        .workdir(temp.path());
    let sink = MemorySink::new();
    let stop = update
        .execute(&SystemExecutor::default(), &sink)
        .unwrap_err();
    assert_eq!(stop.kind(), FailureKind::Execution);
    assert!(
        sink.contents()
            .contains("NuGet Update failed, see the build log for more details.")
    );
}

#[test]
fn missing_program_is_a_launch_failure() {
    let mut update = NugetUpdate::new(&Registry::default());
    update
        .input_file("pkg.nuspec")
        .command("/nonexistent/toolrun-test/nuget");
    let sink = MemorySink::new();
    let stop = update
        .execute(&SystemExecutor::default(), &sink)
        .unwrap_err();
    assert_eq!(stop.kind(), FailureKind::Launch);
}
