//! Tensor records and issues produced by scans

use serde::Serialize;

use crate::error::{Error, Result};
use crate::graph::{NodePath, TensorLike, format_grad_fn, format_shape};

/// Snapshot of one tensor's autograd metadata at a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TensorRecord {
    pub path: String,
    pub shape: Vec<usize>,
    pub is_leaf: bool,
    pub requires_grad: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grad_fn: Option<String>,
    pub device: String,
}

impl TensorRecord {
    /// Read a tensor's flags, failing if they contradict each other.
    ///
    /// A non-leaf must name its producing operation and a leaf must not.
    pub fn capture(path: &NodePath, tensor: &dyn TensorLike) -> Result<Self> {
        let is_leaf = tensor.is_leaf();
        let grad_fn = tensor.grad_fn().map(str::to_string);
        match (is_leaf, &grad_fn) {
            (false, None) => {
                return Err(Error::Classification {
                    path: path.to_string(),
                    message: "non-leaf tensor has no producing operation".to_string(),
                });
            }
            (true, Some(op)) => {
                return Err(Error::Classification {
                    path: path.to_string(),
                    message: format!("leaf tensor carries producing operation {}", op),
                });
            }
            _ => {}
        }
        Ok(Self {
            path: path.to_string(),
            shape: tensor.shape().to_vec(),
            is_leaf,
            requires_grad: tensor.requires_grad(),
            grad_fn,
            device: tensor.device().to_string(),
        })
    }

    /// Fields of a full dump line, without the path.
    pub fn dump_fields(&self) -> String {
        format!(
            "shape={}, is_leaf={}, requires_grad={}, grad_fn={}, device={}",
            format_shape(&self.shape),
            py_bool(self.is_leaf),
            py_bool(self.requires_grad),
            format_grad_fn(self.grad_fn.as_deref()),
            self.device
        )
    }

    /// `path : shape=..., is_leaf=..., ...`
    pub fn dump_line(&self) -> String {
        format!("{} : {}", self.path, self.dump_fields())
    }

    pub fn non_leaf_fields(&self) -> String {
        format!(
            "shape={}, requires_grad={}",
            format_shape(&self.shape),
            py_bool(self.requires_grad)
        )
    }

    pub fn non_leaf_line(&self) -> String {
        format!("non-leaf tensor at {}: {}", self.path, self.non_leaf_fields())
    }

    /// Deep-copy hazard description: everything but the leaf flag.
    pub fn description(&self) -> String {
        format!(
            "shape={}, requires_grad={}, grad_fn={}, device={}",
            format_shape(&self.shape),
            py_bool(self.requires_grad),
            format_grad_fn(self.grad_fn.as_deref()),
            self.device
        )
    }

    pub fn to_issue(&self) -> Issue {
        Issue {
            path: self.path.clone(),
            description: self.description(),
        }
    }
}

/// A `(path, description)` finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub path: String,
    pub description: String,
}

impl Issue {
    pub fn new(path: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            description: description.into(),
        }
    }

    pub fn line(&self) -> String {
        format!("Path: {} -> {}", self.path, self.description)
    }
}

fn py_bool(b: bool) -> &'static str {
    if b { "True" } else { "False" }
}
