//! Deep-copy probing: find which part of a model refuses to be duplicated
//!
//! Generic structural copy breaks on non-leaf tensors, because they carry
//! live references into the autograd graph. `probe_deep_copy` tries to copy
//! a model, and on failure descends into its child modules to narrow down
//! where the offending tensor lives.

use std::collections::HashMap;

use log::debug;
use serde::Serialize;

use crate::error::{Error, NodeError, Result};
use crate::graph::{Key, NodeId, NodePath, Value, VisitedSet};
use crate::scan::Issue;

/// Why a deep copy failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CopyError {
    #[error(
        "only tensors created explicitly by the user (graph leaves) support deep copy; \
         found a non-leaf tensor at {path}"
    )]
    NonLeafTensor { path: String },

    #[error("cannot read {path}: {source}")]
    Read { path: String, source: NodeError },
}

impl CopyError {
    /// Short error kind, for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            CopyError::NonLeafTensor { .. } => "NonLeafTensor",
            CopyError::Read { .. } => "ReadError",
        }
    }
}

/// Full structural duplication that keeps aliasing and cycles intact.
pub trait DeepCopy: Sized {
    fn deep_copy(&self) -> std::result::Result<Self, CopyError>;
}

impl DeepCopy for Value {
    fn deep_copy(&self) -> std::result::Result<Self, CopyError> {
        let mut memo = HashMap::new();
        copy_value(self, &NodePath::root(""), &mut memo)
    }
}

fn copy_value(
    value: &Value,
    path: &NodePath,
    memo: &mut HashMap<NodeId, Value>,
) -> std::result::Result<Value, CopyError> {
    let id = value.id();
    if let Some(copy) = id.and_then(|id| memo.get(&id)) {
        return Ok(copy.clone());
    }
    let read_err = |source: NodeError| CopyError::Read {
        path: path.to_string(),
        source,
    };

    let copy = match value {
        Value::Tensor(t) => {
            if !t.is_leaf {
                return Err(CopyError::NonLeafTensor {
                    path: path.to_string(),
                });
            }
            Value::tensor((**t).clone())
        }
        Value::Dict(dict) => {
            let entries: Vec<(Key, Value)> = dict
                .try_borrow()
                .map_err(|_| read_err(NodeError::Borrowed { kind: "dict" }))?
                .entries()
                .to_vec();
            let copy = remember(id, Value::dict(), memo);
            for (key, child) in entries {
                let child = copy_value(&child, &path.key(&key), memo)?;
                copy.insert(key, child).map_err(read_err)?;
            }
            copy
        }
        Value::List(items) | Value::Set(items) => {
            let items: Vec<Value> = items
                .try_borrow()
                .map_err(|_| read_err(NodeError::Borrowed { kind: value.kind_name() }))?
                .clone();
            let empty = if matches!(value, Value::Set(_)) {
                Value::set([])
            } else {
                Value::list([])
            };
            let copy = remember(id, empty, memo);
            for (i, child) in items.iter().enumerate() {
                let child = copy_value(child, &path.index(i), memo)?;
                copy.push(child).map_err(read_err)?;
            }
            copy
        }
        Value::Tuple(items) => {
            let copied = items
                .iter()
                .enumerate()
                .map(|(i, child)| copy_value(child, &path.index(i), memo))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            // A child may have reached this tuple through a cycle already.
            if let Some(copy) = id.and_then(|id| memo.get(&id)) {
                return Ok(copy.clone());
            }
            Value::tuple(copied)
        }
        Value::Object(object) => {
            let (type_name, attrs) = {
                let object = object
                    .try_borrow()
                    .map_err(|_| read_err(NodeError::Borrowed { kind: "object" }))?;
                (object.type_name().to_string(), object.attrs().to_vec())
            };
            let copy = remember(id, Value::object(type_name), memo);
            for (name, child) in attrs {
                let child = copy_value(&child, &path.attr(&name), memo)?;
                copy.set_attr(&name, child).map_err(read_err)?;
            }
            copy
        }
        Value::None | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_) => {
            value.clone()
        }
    };

    if let Some(id) = id {
        memo.insert(id, copy.clone());
    }
    Ok(copy)
}

/// Register `copy` before its children are filled in, so cycles resolve to it.
fn remember(id: Option<NodeId>, copy: Value, memo: &mut HashMap<NodeId, Value>) -> Value {
    if let Some(id) = id {
        memo.insert(id, copy.clone());
    }
    copy
}

/// One module that failed to deep-copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeFailure {
    pub path: String,
    pub kind: String,
    pub message: String,
}

impl ProbeFailure {
    /// The same finding in `(path, description)` form.
    pub fn as_issue(&self) -> Issue {
        Issue::new(self.path.clone(), format!("{}: {}", self.kind, self.message))
    }
}

/// Try to deep-copy `model`; on failure, record it and probe each child
/// module to localize the fault. Modules that copy cleanly are not descended
/// into.
///
/// Every failing module on the way down is reported, outermost first, so
/// the last entries under a given path are the smallest failing subtrees.
pub fn probe_deep_copy(model: &Value, label: &str) -> Result<Vec<ProbeFailure>> {
    let mut failures = Vec::new();
    let mut visited = VisitedSet::new();
    probe(model, &NodePath::root(label), &mut visited, &mut failures)?;
    Ok(failures)
}

fn probe(
    module: &Value,
    path: &NodePath,
    visited: &mut VisitedSet,
    failures: &mut Vec<ProbeFailure>,
) -> Result<()> {
    if let Some(id) = module.id() {
        if !visited.insert(id) {
            return Ok(());
        }
    }
    let Err(err) = module.deep_copy() else {
        return Ok(());
    };
    debug!("deep copy failed at '{}': {}", path, err);
    failures.push(ProbeFailure {
        path: path.to_string(),
        kind: err.kind().to_string(),
        message: err.to_string(),
    });

    let children = module
        .named_children()
        .map_err(|e| Error::traversal(path.as_str(), e.to_string()))?;
    for (name, child) in children {
        probe(&child, &path.attr(name.as_str()), visited, failures)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, NodeKind, Tensor};
    use crate::test_utils::{linear_model, module};

    #[test]
    fn test_copy_preserves_aliasing_and_cycles() {
        let shared = Value::tensor(Tensor::parameter(vec![2]));
        let node = Value::object_with("Node", [("w", shared.clone()), ("w2", shared)]);
        node.set_attr("me", node.clone()).unwrap();

        let copy = node.deep_copy().unwrap();
        assert!(!copy.same_as(&node));
        let w = copy.get_attr("w").unwrap().unwrap();
        let w2 = copy.get_attr("w2").unwrap().unwrap();
        assert!(w.same_as(&w2));
        assert!(copy.get_attr("me").unwrap().unwrap().same_as(&copy));
    }

    #[test]
    fn test_copy_of_tuple_and_set() {
        let t = Value::tensor(Tensor::leaf(vec![1]));
        let root = Value::tuple([Value::set([t.clone()]), t]);
        let copy = root.deep_copy().unwrap();
        let NodeKind::Sequence(items) = copy.classify().unwrap() else {
            panic!("expected tuple");
        };
        let NodeKind::Sequence(inner) = items[0].classify().unwrap() else {
            panic!("expected set");
        };
        assert!(inner[0].same_as(&items[1]));
    }

    #[test]
    fn test_copy_refuses_non_leaf() {
        let root = Value::dict_from([(
            "cache",
            Value::list([Value::tensor(Tensor::computed(vec![1], "AddBackward0"))]),
        )]);
        let err = root.deep_copy().unwrap_err();
        assert_eq!(
            err,
            CopyError::NonLeafTensor {
                path: "['cache'][0]".to_string()
            }
        );
        assert_eq!(err.kind(), "NonLeafTensor");
    }

    #[test]
    fn test_probe_clean_model_reports_nothing() {
        assert!(probe_deep_copy(&linear_model(), "model").unwrap().is_empty());
    }

    #[test]
    fn test_probe_localizes_failure() {
        let bad = module(
            "Linear",
            [("last_out", Value::tensor(Tensor::computed(vec![5], "AddmmBackward0")))],
        );
        let good = module("ReLU", []);
        let model = module(
            "Sequential",
            [("_modules", Value::dict_from([("0", good), ("1", bad)]))],
        );

        let failures = probe_deep_copy(&model, "").unwrap();
        let paths: Vec<&str> = failures.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["", "_modules['1']"]);
        assert_eq!(failures[1].kind, "NonLeafTensor");
        assert!(failures[1].message.contains("last_out"));

        let issue = failures[1].as_issue();
        assert_eq!(issue.path, "_modules['1']");
        assert!(issue.description.starts_with("NonLeafTensor: "));
    }
}
