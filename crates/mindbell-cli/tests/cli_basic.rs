//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data directory.

mod common;

use common::{message_kinds, run_cli_failure, run_cli_success, run_json};

#[test]
fn fresh_status_is_idle_with_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let doc = run_json(dir.path(), &["status"]);
    assert_eq!(doc["status"]["state"], "idle");
    assert_eq!(doc["launch"]["path"], "status");
    assert_eq!(message_kinds(&doc), vec!["prompt"]);
}

#[test]
fn start_twice_keeps_one_wakeup() {
    let dir = tempfile::tempdir().unwrap();
    run_cli_success(dir.path(), &["config", "set", "wakeup.delay_secs", "600"]);

    let first = run_json(dir.path(), &["start"]);
    assert_eq!(first["outcome"]["outcome"], "scheduled");
    let id = first["outcome"]["id"].clone();
    assert_eq!(message_kinds(&first), vec!["prompt", "scheduled"]);

    let second = run_json(dir.path(), &["start"]);
    assert_eq!(second["outcome"]["outcome"], "already_pending");
    assert_eq!(second["outcome"]["id"], id);
    assert_eq!(message_kinds(&second), vec!["remaining", "remaining"]);

    let status = run_json(dir.path(), &["status"]);
    assert_eq!(status["status"]["state"], "pending");
    assert_eq!(status["status"]["id"], id);
}

#[test]
fn missed_wakeup_fires_on_next_launch_only_once() {
    let dir = tempfile::tempdir().unwrap();
    run_cli_success(dir.path(), &["config", "set", "wakeup.delay_secs", "0"]);
    run_json(dir.path(), &["start"]);

    let launched = run_json(dir.path(), &["status"]);
    assert_eq!(launched["launch"]["path"], "fired");
    assert_eq!(launched["launch"]["outcome"], "handled");
    assert_eq!(launched["status"]["state"], "idle");
    assert_eq!(message_kinds(&launched), vec!["fired"]);
    assert_eq!(launched["pulses"], 1);

    let after = run_json(dir.path(), &["status"]);
    assert_eq!(after["launch"]["path"], "status");
    assert_eq!(message_kinds(&after), vec!["prompt"]);
}

#[test]
fn watch_delivers_the_wakeup() {
    let dir = tempfile::tempdir().unwrap();
    run_cli_success(dir.path(), &["config", "set", "wakeup.delay_secs", "1"]);
    run_json(dir.path(), &["start"]);

    let doc = run_json(
        dir.path(),
        &["watch", "--interval-ms", "50", "--duration-secs", "3"],
    );
    let fired = message_kinds(&doc)
        .into_iter()
        .filter(|kind| kind == "fired")
        .count();
    assert_eq!(fired, 1);

    let status = run_json(dir.path(), &["status"]);
    assert_eq!(status["status"]["state"], "idle");
}

#[test]
fn answer_is_acknowledged() {
    let dir = tempfile::tempdir().unwrap();
    let doc = run_json(dir.path(), &["answer", "aware"]);
    let messages = doc["messages"].as_array().unwrap();
    let last = messages.last().unwrap();
    assert_eq!(last["kind"], "acknowledged");
    assert_eq!(last["answer"], "aware");
}

#[test]
fn text_output_prints_messages() {
    let dir = tempfile::tempdir().unwrap();
    let stdout = run_cli_success(dir.path(), &["status"]);
    assert!(stdout.contains("begin being aware of your breathing"));
}

#[test]
fn config_round_trip_and_errors() {
    let dir = tempfile::tempdir().unwrap();
    run_cli_success(dir.path(), &["config", "set", "wakeup.delay_secs", "11"]);
    let value = run_cli_success(dir.path(), &["config", "get", "wakeup.delay_secs"]);
    assert_eq!(value.trim(), "11");

    run_cli_failure(dir.path(), &["config", "get", "wakeup.nope"]);
    let (_, stderr, code) = run_cli_failure(dir.path(), &["config", "set", "wakeup.delay_secs", "-5"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));

    run_cli_success(dir.path(), &["config", "reset"]);
    let value = run_cli_success(dir.path(), &["config", "get", "wakeup.delay_secs"]);
    assert_eq!(value.trim(), "240");
}

#[test]
fn oversized_delay_is_an_error_not_a_crash() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli_failure(
        dir.path(),
        &["config", "set", "wakeup.delay_secs", "9223372036854775807"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("wakeup.delay_secs"));

    std::fs::write(
        dir.path().join("config.toml"),
        "[wakeup]\ndelay_secs = 100000000000000\n",
    )
    .unwrap();
    let (_, stderr, code) = run_cli_failure(dir.path(), &["start"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));

    run_cli_success(dir.path(), &["config", "reset"]);
    let doc = run_json(dir.path(), &["status"]);
    assert_eq!(doc["status"]["state"], "idle");
}
