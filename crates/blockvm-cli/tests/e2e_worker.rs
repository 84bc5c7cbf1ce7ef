//! E2E tests for the `blockvm` binary.
//!
//! Drives the worker over stdin and checks both output channels:
//! events on stderr, diagnostics and script output on stdout.

mod common;

use common::{block, blockvm_cmd, sentinel};
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

// ─── Sessions ──────────────────────────────────────────────────────

#[test]
fn runs_blocks_and_reports_events() {
    let temp = tempfile::tempdir().unwrap();
    let input = format!(
        "{}{}{}",
        block("a.lua", "x = 20"),
        block("b.lua", "print(x + 1)"),
        sentinel("END_INTERPRETER"),
    );

    blockvm_cmd(temp.path())
        .write_stdin(input)
        .assert()
        .success()
        .stdout("21\n")
        .stderr(contains("BLOCKVM_INTERPRETER_READY"))
        .stderr(contains("BLOCKVM_INTERPRETER_SCRIPT_FINISHED"));
}

#[test]
fn empty_stdin_finishes_one_session() {
    let temp = tempfile::tempdir().unwrap();
    blockvm_cmd(temp.path())
        .write_stdin("")
        .assert()
        .success()
        .stdout("")
        .stderr(contains("BLOCKVM_INTERPRETER_SCRIPT_FINISHED"));
}

#[test]
fn failing_block_reports_on_stdout() {
    let temp = tempfile::tempdir().unwrap();
    let input = format!(
        "{}{}",
        block("boom.lua", "error('boom')"),
        sentinel("END_OF_SCRIPT"),
    );

    blockvm_cmd(temp.path())
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("BLOCKVM_INTERPRETER_ERROR\nboom.lua:1: boom\nboom.lua:1\n"))
        .stderr(contains("BLOCKVM_INTERPRETER_SCRIPT_FINISHED"))
        .stderr(contains("BLOCKVM_INTERPRETER_READY").not());
}

#[test]
fn worker_serves_the_next_script_after_a_failure() {
    let temp = tempfile::tempdir().unwrap();
    let input = format!(
        "{}{}{}{}{}",
        block("bad.lua", "error('first')"),
        block("skipped.lua", "print('skipped')"),
        sentinel("END_OF_SCRIPT"),
        block("good.lua", "print('second script')"),
        sentinel("END_INTERPRETER"),
    );

    blockvm_cmd(temp.path())
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("bad.lua:1: first"))
        .stdout(contains("second script"))
        .stdout(contains("skipped\n").not());
}

#[test]
fn globals_do_not_survive_sessions() {
    let temp = tempfile::tempdir().unwrap();
    let input = format!(
        "{}{}{}{}",
        block("a.lua", "leak = 'yes'"),
        sentinel("END_OF_SCRIPT"),
        block("b.lua", "print(leak)"),
        sentinel("END_INTERPRETER"),
    );

    blockvm_cmd(temp.path())
        .write_stdin(input)
        .assert()
        .success()
        .stdout("nil\n");
}

#[test]
fn once_serves_a_single_script() {
    let temp = tempfile::tempdir().unwrap();
    let input = format!(
        "{}{}{}",
        sentinel("END_OF_SCRIPT"),
        block("later.lua", "print('not run')"),
        sentinel("END_OF_SCRIPT"),
    );

    blockvm_cmd(temp.path())
        .arg("--once")
        .write_stdin(input)
        .assert()
        .success()
        .stdout("");
}

// ─── Configuration ─────────────────────────────────────────────────

#[test]
fn prefix_flag_changes_sentinels() {
    let temp = tempfile::tempdir().unwrap();
    let input = "m.lua\nprint('custom')\nACME_END_OF_BLOCK\nACME_END_INTERPRETER\n";

    blockvm_cmd(temp.path())
        .args(["--prefix", "ACME"])
        .write_stdin(input)
        .assert()
        .success()
        .stdout("custom\n")
        .stderr(contains("ACME_READY"))
        .stderr(contains("ACME_SCRIPT_FINISHED"));
}

#[test]
fn prefix_from_project_config() {
    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path().join(".blockvm");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), "[protocol]\nprefix = \"PROJ\"\n").unwrap();

    blockvm_cmd(temp.path())
        .write_stdin("PROJ_END_INTERPRETER\n")
        .assert()
        .success()
        .stderr(contains("PROJ_SCRIPT_FINISHED"));
}

#[test]
fn explicit_config_file_overrides_project_config() {
    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path().join(".blockvm");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), "[protocol]\nprefix = \"PROJ\"\n").unwrap();
    let explicit = temp.path().join("worker.toml");
    std::fs::write(&explicit, "[protocol]\nprefix = \"FILE\"\n").unwrap();

    blockvm_cmd(temp.path())
        .arg("--config")
        .arg(&explicit)
        .write_stdin("FILE_END_INTERPRETER\n")
        .assert()
        .success()
        .stderr(contains("FILE_SCRIPT_FINISHED"));
}

#[test]
fn env_prefix_is_honoured() {
    let temp = tempfile::tempdir().unwrap();
    blockvm_cmd(temp.path())
        .env("BLOCKVM_PROTOCOL_PREFIX", "ENVP")
        .write_stdin("ENVP_END_INTERPRETER\n")
        .assert()
        .success()
        .stderr(contains("ENVP_SCRIPT_FINISHED"));
}

#[test]
fn require_uses_runtime_home() {
    let temp = tempfile::tempdir().unwrap();
    let home = temp.path().join("lib");
    std::fs::create_dir_all(&home).unwrap();
    std::fs::write(
        home.join("greet.lua"),
        "return { hello = function(n) return 'hello ' .. n end }\n",
    )
    .unwrap();
    let input = format!(
        "{}{}",
        block("main.lua", "print(require('greet').hello('lua'))"),
        sentinel("END_INTERPRETER"),
    );

    blockvm_cmd(temp.path())
        .arg("--runtime-home")
        .arg(&home)
        .write_stdin(input)
        .assert()
        .success()
        .stdout("hello lua\n");
}

// ─── Bootstrap failures ────────────────────────────────────────────

#[test]
fn missing_runtime_home_exits_with_one() {
    let temp = tempfile::tempdir().unwrap();
    blockvm_cmd(temp.path())
        .arg("--runtime-home")
        .arg(temp.path().join("absent"))
        .write_stdin("")
        .assert()
        .code(1)
        .stderr(contains("Error:"));
}

#[test]
fn missing_config_file_exits_with_one() {
    let temp = tempfile::tempdir().unwrap();
    blockvm_cmd(temp.path())
        .arg("--config")
        .arg(temp.path().join("absent.toml"))
        .write_stdin("")
        .assert()
        .code(1)
        .stderr(contains("failed to load configuration"));
}

#[test]
fn blank_prefix_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    blockvm_cmd(temp.path())
        .args(["--prefix", "has space"])
        .write_stdin("")
        .assert()
        .code(1)
        .stderr(contains("invalid configuration"));
}

// ─── Logging ───────────────────────────────────────────────────────

#[test]
fn debug_logs_go_to_log_file() {
    let temp = tempfile::tempdir().unwrap();
    let log = temp.path().join("logs").join("worker.log");
    let input = format!(
        "{}{}",
        block("a.lua", "x = 1"),
        sentinel("END_INTERPRETER"),
    );

    blockvm_cmd(temp.path())
        .arg("-d")
        .arg("--log-file")
        .arg(&log)
        .write_stdin(input)
        .assert()
        .success()
        .stderr(contains("DEBUG").not());

    let written = std::fs::read_to_string(&log).unwrap();
    assert!(written.contains("DEBUG"), "log file: {written}");
    assert!(!written.contains('\u{1b}'), "ANSI escapes in log file");
}

#[test]
fn debug_logs_on_stderr_leave_sentinels_intact() {
    let temp = tempfile::tempdir().unwrap();
    let input = format!(
        "{}{}",
        block("a.lua", "print('ok')"),
        sentinel("END_INTERPRETER"),
    );

    let output = blockvm_cmd(temp.path())
        .arg("-d")
        .write_stdin(input)
        .assert()
        .success()
        .stdout("ok\n")
        .get_output()
        .clone();

    let stderr = String::from_utf8_lossy(&output.stderr);
    let events: Vec<&str> = stderr
        .lines()
        .filter(|l| l.starts_with("BLOCKVM_INTERPRETER_"))
        .collect();
    assert_eq!(
        events,
        ["BLOCKVM_INTERPRETER_READY", "BLOCKVM_INTERPRETER_SCRIPT_FINISHED"]
    );
}
