//! CommandRunner against real processes.
//!
//! `sh -c <script>` stands in for `<runner> -e <image>`: the execute flag
//! slot carries `-c` and the image slot carries the script.

#![cfg(unix)]

use aslr_harness::*;

fn shell(script: &str) -> HarnessConfig {
    HarnessConfig::new("sh")
        .with_execute_flag("-c")
        .with_image(script)
}

#[test]
fn captures_stdout() {
    let script = "echo booting; echo 'ADDRESS_LIST:{\"heap\":\"0x10\"}'";
    let runner = CommandRunner::new(shell(script).runner);
    let output = runner.run().unwrap();

    assert!(output.stdout.starts_with("booting\n"));
    let report = extract_report(&output.stdout, DEFAULT_MARKER).unwrap();
    assert_eq!(report.get("heap"), Some(0x10));
}

#[test]
fn stderr_is_not_captured() {
    let runner = CommandRunner::new(shell("echo noise >&2; echo out").runner);
    assert_eq!(runner.run().unwrap().stdout, "out\n");
}

#[test]
fn passes_extra_environment() {
    let config = shell("echo \"$GUEST_TAG\"").with_env("GUEST_TAG", "tagged");
    let output = CommandRunner::new(config.runner).run().unwrap();
    assert_eq!(output.stdout.trim(), "tagged");
}

#[test]
fn non_zero_exit_is_a_launch_error() {
    let runner = CommandRunner::new(shell("echo 'kernel panic: no init'; exit 3").runner);
    let err = runner.run().unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Launch);
    let message = err.to_string();
    assert!(message.contains("exit status: 3"), "{message}");
    assert!(message.ends_with("kernel panic: no init\n"), "{message}");
    match err {
        HarnessError::RunnerFailed { status, .. } => assert_eq!(status.code(), Some(3)),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_program_is_a_launch_error() {
    let config = HarnessConfig::new("/nonexistent/aslr/run.py");
    let err = CommandRunner::new(config.runner).run().unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Launch);
    assert!(matches!(err, HarnessError::Spawn { .. }));
}

#[test]
fn invalid_utf8_is_a_protocol_error() {
    let runner = CommandRunner::new(shell("printf '\\377\\376'").runner);
    let err = runner.run().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
}

#[test]
fn counter_backed_runs_diverge() {
    // Each boot bumps a counter file, so the two reports always differ.
    let dir = tempfile::tempdir().unwrap();
    let counter = dir.path().join("count");
    let script = format!(
        "n=$(cat {c} 2>/dev/null || echo 1); echo $((n + 1)) > {c}; \
         echo \"ADDRESS_LIST:{{\\\"mmap\\\":\\\"$n\\\"}}\"",
        c = counter.display()
    );

    let result = check(&shell(&script)).unwrap();

    assert_eq!(result.entries.len(), 1);
    result.assert_divergent();
}

#[test]
fn identical_runs_collide() {
    let result = check(&shell("echo 'ADDRESS_LIST:{\"kernel\":\"1000\"}'")).unwrap();
    let err = result.check().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invariant);
}
