//! Edge case and error handling tests for gradwalk


use gradwalk::test_utils::{cyclic_pair, deep_chain, linear_model, with_activation_cache};
use gradwalk::{
    Error, GraphWalker, NodePath, Result, Snapshot, Tensor, TensorLike, Value, VisitedSet,
    collect_issues, walk,
};
use harness::{TestDir, run_gradwalk};

fn visit_paths(root: &Value) -> Vec<String> {
    let mut paths = Vec::new();
    walk(root, "root", &mut |p: &NodePath, _: &dyn TensorLike| -> Result<()> {
        paths.push(p.to_string());
        Ok(())
    })
    .expect("walk succeeds");
    paths
}

// ============================================================================
// Cycles and aliasing
// ============================================================================

#[test]
fn test_mutual_references_terminate() {
    let (a, _b) = cyclic_pair();
    assert_eq!(visit_paths(&a), vec!["root.t", "root.peer.t"]);
}

#[test]
fn test_self_containing_list() {
    let list = Value::list([Value::tensor(Tensor::leaf(vec![1]))]);
    list.push(list.clone()).unwrap();
    assert_eq!(visit_paths(&list), vec!["root[0]"]);
}

#[test]
fn test_diamond_reports_first_path_only() {
    let t = Value::tensor(Tensor::computed(vec![4], "SumBackward0"));
    let left = Value::object_with("Left", [("t", t.clone())]);
    let right = Value::object_with("Right", [("t", t)]);
    let root = Value::tuple([left, right]);

    let issues = collect_issues(&root, "root").unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].path, "root[0].t");
}

#[test]
fn test_repeated_walks_start_fresh() {
    let model = with_activation_cache(linear_model());
    let first = collect_issues(&model, "obj").unwrap();
    let second = collect_issues(&model, "obj").unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[test]
fn test_shared_visited_set_is_explicit() {
    let model = with_activation_cache(linear_model());
    let mut visited = VisitedSet::new();
    let mut count = 0;
    let mut counter = |_: &NodePath, _: &dyn TensorLike| -> Result<()> {
        count += 1;
        Ok(())
    };
    GraphWalker::new(&mut visited, &mut counter)
        .run(&model, &NodePath::root("a"))
        .unwrap();
    let again = GraphWalker::new(&mut visited, &mut counter)
        .run(&model, &NodePath::root("b"))
        .unwrap();
    assert_eq!(again.aliases_skipped, 1);
    assert_eq!(again.tensors, 0);
    assert_eq!(count, 6);
}

// ============================================================================
// Depth and empty graphs
// ============================================================================

#[test]
fn test_moderately_deep_chain() {
    let root = deep_chain(200);
    let paths = visit_paths(&root);
    assert_eq!(paths.len(), 1);
    assert!(paths[0].ends_with(".next.t"));
    assert_eq!(paths[0].matches(".next").count(), 200);
}

#[test]
fn test_scalar_root_has_no_visits() {
    assert!(visit_paths(&Value::Float(1.0)).is_empty());
    assert!(collect_issues(&Value::str("model"), "obj").unwrap().is_empty());
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_borrowed_container_is_a_traversal_error() {
    let inner = Value::list([]);
    let root = Value::dict_from([("inner", inner.clone())]);
    let Value::List(cell) = &inner else {
        unreachable!()
    };
    let _guard = cell.borrow_mut();

    match collect_issues(&root, "obj") {
        Err(Error::Traversal { path, message }) => {
            assert_eq!(path, "obj['inner']");
            assert!(message.contains("borrowed"));
        }
        other => panic!("expected traversal error, got {:?}", other),
    }
}

#[test]
fn test_malformed_snapshot_rejected() {
    assert!(matches!(
        Snapshot::from_json(r#"{"root": 1, "extra": 2}"#),
        Err(Error::Json(_))
    ));
}

#[test]
fn test_missing_snapshot_file() {
    let dir = TestDir::new();
    let (_stdout, stderr, success) = run_gradwalk(dir.path(), &["nope.json"]);
    assert!(!success);
    assert!(stderr.contains("gradwalk: cannot load 'nope.json'"), "{}", stderr);
}

#[test]
fn test_unknown_reference_in_snapshot() {
    let dir = TestDir::new();
    dir.add_file("bad.json", r#"{"root": {"list": [{"ref": "ghost"}]}}"#);
    let (_stdout, stderr, success) = run_gradwalk(dir.path(), &["bad.json"]);
    assert!(!success);
    assert!(stderr.contains("unknown reference 'ghost'"), "{}", stderr);
}

#[test]
fn test_inconsistent_tensor_in_snapshot() {
    let dir = TestDir::new();
    dir.add_file(
        "bad.json",
        r#"{"root": {"dict": [["x", {"tensor": {"shape": [1], "is_leaf": false}}]]}}"#,
    );
    let (_stdout, stderr, success) = run_gradwalk(dir.path(), &["bad.json", "--issues"]);
    assert!(!success);
    assert!(stderr.contains("inconsistent tensor at obj['x']"), "{}", stderr);
}

#[test]
fn test_dropout_mode_on_non_module_fails() {
    let dir = TestDir::new();
    dir.add_file("list.json", r#"{"root": {"list": []}}"#);
    let (_stdout, stderr, success) =
        run_gradwalk(dir.path(), &["list.json", "--dropout-train-only"]);
    assert!(!success);
    assert!(stderr.contains("is not a module"), "{}", stderr);
}
