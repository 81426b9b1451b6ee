//! Integration tests for gradwalk


use assert_cmd::Command;
use harness::{CLEAN_MODEL, MODEL_WITH_CACHE, TestDir, run_gradwalk};
use predicates::prelude::*;

fn gradwalk() -> Command {
    let mut cmd = Command::cargo_bin("gradwalk").expect("binary built");
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_default_dumps_every_tensor_once() {
    let dir = TestDir::new();
    dir.add_file("model.json", MODEL_WITH_CACHE);

    let (stdout, _stderr, success) = run_gradwalk(dir.path(), &["model.json"]);
    assert!(success, "gradwalk should succeed");
    assert_eq!(stdout.lines().count(), 5, "4 parameters + 1 cached output: {}", stdout);
    assert!(stdout.contains(
        "obj._modules['0'].weight : shape=(10, 10), is_leaf=True, requires_grad=True, grad_fn=None, device=cpu"
    ));
    // The alias under _cache is reached second and skipped
    assert!(!stdout.contains("_cache"), "alias should be skipped: {}", stdout);
}

#[test]
fn test_non_leaf_flag() {
    let dir = TestDir::new();
    dir.add_file("model.json", MODEL_WITH_CACHE);

    gradwalk()
        .current_dir(dir.path())
        .args(["model.json", "--non-leaf"])
        .assert()
        .success()
        .stdout(
            "non-leaf tensor at obj._modules['2'].last_output: shape=(5,), requires_grad=True\n",
        );
}

#[test]
fn test_issues_flag() {
    let dir = TestDir::new();
    dir.add_file("model.json", MODEL_WITH_CACHE);

    gradwalk()
        .current_dir(dir.path())
        .args(["model.json", "--issues", "--label", "model"])
        .assert()
        .success()
        .stdout(predicate::eq(
            "Path: model._modules['2'].last_output -> shape=(5,), requires_grad=True, \
             grad_fn=<AddmmBackward0>, device=cuda:0\n",
        ));
}

#[test]
fn test_issues_json() {
    let dir = TestDir::new();
    dir.add_file("model.json", MODEL_WITH_CACHE);

    let (stdout, _stderr, success) = run_gradwalk(dir.path(), &["model.json", "--issues", "--json"]);
    assert!(success);
    let issues: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(issues.as_array().map(Vec::len), Some(1));
    assert_eq!(issues[0]["path"], "obj._modules['2'].last_output");
}

#[test]
fn test_json_records() {
    let dir = TestDir::new();
    dir.add_file("model.json", MODEL_WITH_CACHE);

    let (stdout, _stderr, success) = run_gradwalk(dir.path(), &["model.json", "--json"]);
    assert!(success);
    let records: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    let records = records.as_array().expect("array");
    assert_eq!(records.len(), 5);
    assert_eq!(records[0]["shape"], serde_json::json!([10, 10]));
    assert_eq!(records[4]["grad_fn"], "AddmmBackward0");
    assert_eq!(records[4]["is_leaf"], false);
}

#[test]
fn test_report_file() {
    let dir = TestDir::new();
    dir.add_file("model.json", MODEL_WITH_CACHE);

    gradwalk()
        .current_dir(dir.path())
        .args(["model.json", "-o", "debug_info.txt"])
        .assert()
        .success()
        .stderr(predicate::str::contains("debug_info.txt"));

    let report = std::fs::read_to_string(dir.path().join("debug_info.txt")).unwrap();
    let (dump, issues) = report
        .split_once("\n\n")
        .expect("sections separated by a blank line");
    assert!(dump.starts_with("--- all tensors ---\n"));
    assert_eq!(dump.lines().count(), 6);
    assert_eq!(
        issues.lines().collect::<Vec<_>>(),
        vec![
            "--- tensors that may break deep copy ---",
            "Path: obj._modules['2'].last_output -> shape=(5,), requires_grad=True, grad_fn=<AddmmBackward0>, device=cuda:0",
        ]
    );
}

#[test]
fn test_report_file_without_issues() {
    let dir = TestDir::new();
    dir.add_file("clean.json", CLEAN_MODEL);

    let (_stdout, _stderr, success) = run_gradwalk(dir.path(), &["clean.json", "-o", "out.txt"]);
    assert!(success);
    let report = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
    assert!(report.ends_with(
        "--- tensors that may break deep copy ---\nno problematic tensors found.\n"
    ));
}

#[test]
fn test_probe_localizes_failing_module() {
    let dir = TestDir::new();
    dir.add_file("model.json", MODEL_WITH_CACHE);

    let (stdout, _stderr, success) = run_gradwalk(dir.path(), &["model.json", "--probe", "--json"]);
    assert!(success);
    let failures: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    let paths: Vec<&str> = failures
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|f| f["path"].as_str())
        .collect();
    assert_eq!(paths, vec!["obj", "obj._modules['2']"]);
    assert_eq!(failures[1]["kind"], "NonLeafTensor");
}

#[test]
fn test_probe_text_output() {
    let dir = TestDir::new();
    dir.add_file("model.json", MODEL_WITH_CACHE);

    gradwalk()
        .current_dir(dir.path())
        .args(["model.json", "--probe"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Error in module: obj._modules['2']"))
        .stdout(predicate::str::contains("Error type: NonLeafTensor"));
}

#[test]
fn test_probe_in_report() {
    let dir = TestDir::new();
    dir.add_file("clean.json", CLEAN_MODEL);

    let (_stdout, _stderr, success) =
        run_gradwalk(dir.path(), &["clean.json", "--probe", "-o", "r.txt"]);
    assert!(success);
    let report = std::fs::read_to_string(dir.path().join("r.txt")).unwrap();
    assert!(report.ends_with("--- deep copy probe ---\nevery module deep-copies cleanly.\n"));
}

#[test]
fn test_dropout_train_only_reenables_dropout_modules() {
    let dir = TestDir::new();
    dir.add_file("model.json", MODEL_WITH_CACHE);

    gradwalk()
        .current_dir(dir.path())
        .env("RUST_LOG", "gradwalk=info")
        .args(["model.json", "--dropout-train-only", "--non-leaf"])
        .assert()
        .success()
        .stdout(predicate::str::contains("non-leaf tensor at obj.").count(1))
        .stderr(predicate::str::contains(
            "1 dropout modules left in training mode",
        ));
}

#[test]
fn test_mode_is_untouched_without_dropout_flag() {
    let dir = TestDir::new();
    dir.add_file("model.json", MODEL_WITH_CACHE);

    gradwalk()
        .current_dir(dir.path())
        .env("RUST_LOG", "gradwalk=info")
        .args(["model.json", "--non-leaf"])
        .assert()
        .success()
        .stderr(predicate::str::contains("dropout modules").not());
}

#[test]
fn test_conflicting_modes_rejected() {
    let dir = TestDir::new();
    dir.add_file("model.json", MODEL_WITH_CACHE);

    gradwalk()
        .current_dir(dir.path())
        .args(["model.json", "--non-leaf", "--issues"])
        .assert()
        .failure();
}
